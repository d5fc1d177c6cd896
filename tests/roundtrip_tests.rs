//! Save/load round trips across every store kind.

mod common;

use std::rc::Rc;

use objarchive::prelude::*;
use objarchive::store::MemoryStore;
use tempfile::NamedTempFile;

use common::*;

fn save_scene_bytes(scene: &mut Scene) -> Vec<u8> {
    save_to_memory(scene, &registry(), SaveOptions::default()).expect("save to memory")
}

#[test]
fn test_roundtrip_memory() {
    init_tracing();
    let mut scene = sample_scene();
    let bytes = save_scene_bytes(&mut scene);

    let mut loaded = Scene::default();
    load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default())
        .expect("load from memory");
    assert_eq!(scene_view(&loaded), scene_view(&scene));
}

#[test]
fn test_roundtrip_file() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    let mut scene = sample_scene();
    save_to_file(&mut scene, path, &registry(), SaveOptions::default()).expect("save to file");

    let mut loaded = Scene::default();
    load_from_file(&mut loaded, path, &registry(), LoadOptions::default()).expect("load");
    assert_eq!(scene_view(&loaded), scene_view(&scene));
}

#[test]
fn test_roundtrip_fast_file() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    let mut scene = sample_scene();
    save_to_file(&mut scene, path, &registry(), SaveOptions::default()).expect("save to file");

    let mut loaded = Scene::default();
    load_from_file(&mut loaded, path, &registry(), LoadOptions::default().fast(true))
        .expect("fast load");
    assert_eq!(scene_view(&loaded), scene_view(&scene));
}

#[cfg(feature = "mmap")]
#[test]
fn test_roundtrip_mapped_file() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    let mut scene = sample_scene();
    save_to_file(&mut scene, path, &registry(), SaveOptions::default()).expect("save to file");

    let mut loaded = Scene::default();
    load_from_file(&mut loaded, path, &registry(), LoadOptions::default().mmap(true))
        .expect("mapped load");
    assert_eq!(scene_view(&loaded), scene_view(&scene));
}

#[test]
fn test_roundtrip_big_endian() {
    init_tracing();
    let mut scene = sample_scene();
    let options = SaveOptions::default().byte_order(ByteOrder::BigEndian);
    let bytes = save_to_memory(&mut scene, &registry(), options).expect("save");
    assert_eq!(bytes[3], b'B');

    let mut loaded = Scene::default();
    load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default().fast(true))
        .expect("load");
    assert_eq!(scene_view(&loaded), scene_view(&scene));
}

#[test]
fn test_cross_backend_equivalence() {
    init_tracing();
    let temp = NamedTempFile::new().expect("Failed to create temp file");
    let path = temp.path();

    let mut scene = sample_scene();
    let memory_bytes = save_scene_bytes(&mut scene);
    save_to_file(&mut scene, path, &registry(), SaveOptions::default()).expect("save to file");
    let file_bytes = std::fs::read(path).expect("read back");
    assert_eq!(memory_bytes, file_bytes);

    // Same bytes through a copying store and a borrowing store.
    let mut via_copy = Scene::default();
    let mut arc = Archive::new(
        MemoryStore::from_bytes(&memory_bytes),
        ArchiveMode::Load,
        ByteOrder::LittleEndian,
        registry(),
    );
    arc.open().expect("open");
    arc.stream(&mut via_copy).expect("stream");
    arc.close().expect("close");

    let mut via_borrow = Scene::default();
    load_from_memory(&mut via_borrow, &memory_bytes, &registry(), LoadOptions::default())
        .expect("load");

    let mut via_file = Scene::default();
    load_from_file(&mut via_file, path, &registry(), LoadOptions::default()).expect("load");

    assert_eq!(scene_view(&via_copy), scene_view(&via_borrow));
    assert_eq!(scene_view(&via_file), scene_view(&via_borrow));
}

#[test]
fn test_aliasing_preserved() {
    init_tracing();
    let shared = bone("shared", 2.0, None);
    let a = new_object(IkBone {
        bone: Bone {
            name: Name::from("a"),
            parent: Some(shared.clone()),
            ..Bone::default()
        },
        target: Some(shared.clone()),
        weight: 1.0,
    });
    let mut root = Some(a);
    let bytes = save_to_memory(&mut root, &registry(), SaveOptions::default()).expect("save");

    let mut loaded: Option<ObjectRef> = None;
    load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default()).expect("load");

    let loaded = loaded.expect("root");
    let a = downcast_ref::<IkBone>(&loaded).expect("ik bone");
    assert!(same(&a.bone.parent, &a.target), "both fields must share one instance");
    let parent = a.bone.parent.as_ref().expect("parent");
    assert_eq!(downcast_ref::<Bone>(parent).expect("bone").name.as_str(), "shared");
    // One for each field.
    assert_eq!(Rc::strong_count(parent), 2);
}

#[test]
fn test_shared_bones_across_actor() {
    init_tracing();
    let mut scene = sample_scene();
    let bytes = save_scene_bytes(&mut scene);

    let mut loaded = Scene::default();
    load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default().fast(true))
        .expect("load");

    let actor = loaded.actors[0].as_ref().expect("actor");
    let actor = downcast_ref::<Actor>(actor).expect("actor class");
    assert!(same(&actor.bones[0], &actor.root_bone));

    let spine = actor.bones[1].as_ref().expect("spine");
    let spine = downcast_ref::<Bone>(spine).expect("bone");
    assert!(same(&spine.parent, &actor.root_bone));
    assert!(actor.bones[4].is_none());
}

#[test]
fn test_cycle_roundtrip() {
    init_tracing();
    let a = bone("a", 1.0, None);
    let b = bone("b", 2.0, Some(&a));
    if let Some(mut bone_a) = downcast_mut::<Bone>(&a) {
        bone_a.parent = Some(b.clone());
    }

    let mut root = Some(a.clone());
    let bytes = save_to_memory(&mut root, &registry(), SaveOptions::default()).expect("save");

    for fast in [false, true] {
        let mut loaded: Option<ObjectRef> = None;
        load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default().fast(fast))
            .expect("load");
        let loaded_a = loaded.clone().expect("root");
        let loaded_b = downcast_ref::<Bone>(&loaded_a).and_then(|x| x.parent.clone()).expect("b");
        let back = downcast_ref::<Bone>(&loaded_b).and_then(|x| x.parent.clone()).expect("a");
        assert!(Rc::ptr_eq(&back, &loaded_a));
        assert_eq!(downcast_ref::<Bone>(&loaded_b).expect("bone").name.as_str(), "b");

        // Break the loaded cycle so the test does not leak.
        if let Some(mut x) = downcast_mut::<Bone>(&loaded_b) {
            x.parent = None;
        };
    }

    if let Some(mut bone_a) = downcast_mut::<Bone>(&a) {
        bone_a.parent = None;
    };
}

#[derive(Debug, Default, PartialEq)]
struct Primitives {
    a: u8,
    b: i8,
    c: u16,
    d: i16,
    e: u32,
    f: i32,
    g: u64,
    h: i64,
    i: f32,
    j: f64,
    k: bool,
    text: String,
    numbers: Vec<i32>,
    blob: Vec<u8>,
    empty: String,
}

impl Streamable for Primitives {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.stream(&mut self.a)?;
        arc.stream(&mut self.b)?;
        arc.stream(&mut self.c)?;
        arc.stream(&mut self.d)?;
        arc.stream(&mut self.e)?;
        arc.stream(&mut self.f)?;
        arc.stream(&mut self.g)?;
        arc.stream(&mut self.h)?;
        arc.stream(&mut self.i)?;
        arc.stream(&mut self.j)?;
        arc.stream(&mut self.k)?;
        arc.stream(&mut self.text)?;
        arc.stream(&mut self.numbers)?;
        arc.stream_bytes(&mut self.blob)?;
        arc.stream(&mut self.empty)
    }
}

#[test]
fn test_primitives_both_orders() {
    init_tracing();
    let mut original = Primitives {
        a: 0xFE,
        b: -100,
        c: 0xBEEF,
        d: -12345,
        e: 0xDEAD_BEEF,
        f: i32::MIN,
        g: u64::MAX - 1,
        h: -9_000_000_000,
        i: std::f32::consts::PI,
        j: -1.0e-300,
        k: true,
        text: "Grüße, 世界".to_string(),
        numbers: vec![3, -1, 4, -1, 5],
        blob: vec![0, 1, 2, 0xFF],
        empty: String::new(),
    };

    for order in [ByteOrder::LittleEndian, ByteOrder::BigEndian] {
        let options = SaveOptions::default().byte_order(order);
        let bytes = save_to_memory(&mut original, &registry(), options).expect("save");
        let mut loaded = Primitives::default();
        load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default()).expect("load");
        assert_eq!(loaded, original);
    }
}

#[test]
fn test_directory_pass_idempotent() {
    init_tracing();
    let mut scene = sample_scene();
    let first = create_directory(&mut scene, &registry()).expect("first pass");
    let second = create_directory(&mut scene, &registry()).expect("second pass");
    assert_eq!(first, second);
    assert_eq!(first.num_objects(), 6);

    assert_eq!(save_scene_bytes(&mut scene), save_scene_bytes(&mut scene));
}

#[test]
fn test_measure_matches_payload() {
    init_tracing();
    let mut scene = sample_scene();
    let measured = measure(&mut scene, &registry()).expect("measure");
    let bytes = save_scene_bytes(&mut scene);

    let mut arc = Archive::new(
        MemoryNoCopyStore::new(&bytes),
        ArchiveMode::Load,
        ByteOrder::LittleEndian,
        registry(),
    );
    arc.open().expect("open");
    assert_eq!(arc.directory().payload_length() as u64, measured);
    assert_eq!(arc.tell() + measured, bytes.len() as u64);
}

#[test]
fn test_archive_info_roundtrip() {
    init_tracing();
    let info = ArchiveInfo {
        licensee_name: "Studio".to_string(),
        project_name: "Lipsync".to_string(),
        licensee_version: 7,
        ..ArchiveInfo::default()
    };
    let mut scene = sample_scene();
    let bytes = save_to_memory(&mut scene, &registry(), SaveOptions::default().info(info.clone()))
        .expect("save");

    let mut loaded = Scene::default();
    let read = load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default())
        .expect("load");
    assert_eq!(read, info);
}

/// Encodes to nothing at all.
#[derive(Debug, Default, Clone, PartialEq)]
struct Marker;

impl Streamable for Marker {
    fn stream(&mut self, _arc: &mut Archive<'_>) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_vec_of_empty_elements() {
    init_tracing();
    let mut markers = vec![Marker; 1000];
    let bytes = save_to_memory(&mut markers, &registry(), SaveOptions::default()).expect("save");

    for fast in [false, true] {
        let mut loaded: Vec<Marker> = Vec::new();
        load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default().fast(fast))
            .expect("load");
        assert_eq!(loaded.len(), 1000);
    }
}

#[test]
fn test_nested_vec_of_empty_elements() {
    init_tracing();
    // Only the counts reach the payload.
    let mut nested: Vec<Vec<Marker>> = vec![Vec::new(), vec![Marker; 3], vec![Marker; 500]];
    let bytes = save_to_memory(&mut nested, &registry(), SaveOptions::default()).expect("save");

    let mut loaded: Vec<Vec<Marker>> = Vec::new();
    load_from_memory(&mut loaded, &bytes, &registry(), LoadOptions::default()).expect("load");
    assert_eq!(loaded, nested);
}
