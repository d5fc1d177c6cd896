//! Archive format constants and header structures.

/// Magic bytes at the start of every archive.
pub const ARCHIVE_MAGIC: &[u8; 3] = b"OBJ";

/// Byte-order tag following the magic for little-endian archives.
pub const ORDER_TAG_LITTLE: u8 = b'L';

/// Byte-order tag following the magic for big-endian archives.
pub const ORDER_TAG_BIG: u8 = b'B';

/// Current archive format version. Archives with a larger value are refused.
pub const FORMAT_VERSION: u16 = 1;

/// Current layout version of the directory block.
pub const DIRECTORY_VERSION: u16 = 1;

/// Library version stamped into saved archives (major * 10000 + minor * 100 + patch).
pub const LIBRARY_VERSION: u32 = 10000;

/// Pointer reference value meaning "null".
pub const NULL_REF: u32 = 0;

/// Size of the class index that precedes each object body.
pub const CLASS_INDEX_SIZE: u64 = 2;

/// Default progress granularity (1%).
pub const DEFAULT_UPDATE_FREQUENCY: f32 = 0.01;

/// Byte order used for every multi-byte value in an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    LittleEndian,
    BigEndian,
}

impl ByteOrder {
    /// Byte order of the running host.
    pub const fn native() -> Self {
        if cfg!(target_endian = "big") {
            Self::BigEndian
        } else {
            Self::LittleEndian
        }
    }

    /// Header tag for this order.
    #[inline]
    pub const fn tag(self) -> u8 {
        match self {
            Self::LittleEndian => ORDER_TAG_LITTLE,
            Self::BigEndian => ORDER_TAG_BIG,
        }
    }

    /// Parse a header tag.
    pub const fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            ORDER_TAG_LITTLE => Some(Self::LittleEndian),
            ORDER_TAG_BIG => Some(Self::BigEndian),
            _ => None,
        }
    }
}

/// What an archive does with its store. Fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveMode {
    /// Directory pass: visit the graph, record the directory, write nothing real.
    CreateDirectory,
    /// Write the header, the directory and the payload.
    Save,
    /// Random-access load; objects may be fetched by slot.
    Load,
    /// Forward-only load.
    LoadLinear,
}

impl ArchiveMode {
    /// Modes that encode values.
    #[inline]
    pub const fn is_saving(self) -> bool {
        matches!(self, Self::CreateDirectory | Self::Save)
    }

    /// Modes that decode values.
    #[inline]
    pub const fn is_loading(self) -> bool {
        matches!(self, Self::Load | Self::LoadLinear)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::CreateDirectory => "create-directory",
            Self::Save => "save",
            Self::Load => "load",
            Self::LoadLinear => "load-linear",
        }
    }
}

impl std::fmt::Display for ArchiveMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Writer identity carried in the archive header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    /// Library version that wrote the archive.
    pub writer_version: u32,
    /// Licensee (studio) name.
    pub licensee_name: String,
    /// Licensee project name.
    pub project_name: String,
    /// Licensee-defined version number.
    pub licensee_version: u32,
}

impl Default for ArchiveInfo {
    fn default() -> Self {
        Self {
            writer_version: LIBRARY_VERSION,
            licensee_name: String::new(),
            project_name: String::new(),
            licensee_version: 0,
        }
    }
}

impl ArchiveInfo {
    /// Writer version formatted as `major.minor.patch`.
    pub fn writer_version_string(&self) -> String {
        format_version(self.writer_version)
    }
}

fn format_version(version: u32) -> String {
    let major = version / 10000;
    let minor = (version / 100) % 100;
    let patch = version % 100;
    format!("{}.{}.{}", major, minor, patch)
}

/// Human-readable library version including the build stamp.
pub fn library_version_string() -> String {
    let date = option_env!("OBJARCHIVE_BUILD_DATE").unwrap_or("unknown");
    let time = option_env!("OBJARCHIVE_BUILD_TIME").unwrap_or("unknown");
    format!("objarchive {} (built {} {})", format_version(LIBRARY_VERSION), date, time)
}
