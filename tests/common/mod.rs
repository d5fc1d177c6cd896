//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::rc::Rc;
use std::sync::Arc;

use objarchive::prelude::*;
use objarchive::ClassDesc;

/// Install a test-friendly tracing subscriber once per test binary.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Classes
// ============================================================================

/// One animation key. A plain struct outside the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Key {
    pub time: f32,
    pub value: f32,
}

impl Streamable for Key {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.serialize_type_version("Key", 1)?;
        arc.stream(&mut self.time)?;
        arc.stream(&mut self.value)
    }
}

#[derive(Default)]
pub struct Bone {
    pub name: Name,
    pub length: f32,
    pub parent: Option<ObjectRef>,
    pub keys: Vec<Key>,
}

impl ArchiveClass for Bone {
    const CLASS_NAME: &'static str = "Bone";
    const VERSION: u16 = 1;

    fn serialize(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.serialize_class_version(Self::CLASS_NAME)?;
        arc.stream(&mut self.name)?;
        arc.stream(&mut self.length)?;
        arc.stream_object_of_kind(&mut self.parent, Bone::CLASS_NAME)?;
        arc.stream(&mut self.keys)
    }
}

/// A bone driven by an IK target. Derives from [`Bone`].
#[derive(Default)]
pub struct IkBone {
    pub bone: Bone,
    pub target: Option<ObjectRef>,
    pub weight: f64,
}

impl ArchiveClass for IkBone {
    const CLASS_NAME: &'static str = "IkBone";
    const VERSION: u16 = 0;
    const PARENT: Option<&'static str> = Some(Bone::CLASS_NAME);

    fn serialize(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        self.bone.serialize(arc)?;
        arc.serialize_class_version(Self::CLASS_NAME)?;
        arc.stream(&mut self.target)?;
        arc.stream(&mut self.weight)
    }
}

#[derive(Default)]
pub struct Actor {
    pub name: String,
    pub visible: bool,
    pub scale: f64,
    pub bones: Vec<Option<ObjectRef>>,
    pub root_bone: Option<ObjectRef>,
    pub tags: Vec<Name>,
    pub thumbnail: Vec<u8>,
}

impl ArchiveClass for Actor {
    const CLASS_NAME: &'static str = "Actor";
    const VERSION: u16 = 2;

    fn serialize(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.serialize_class_version(Self::CLASS_NAME)?;
        arc.stream(&mut self.name)?;
        arc.stream(&mut self.visible)?;
        arc.stream(&mut self.scale)?;
        arc.stream(&mut self.bones)?;
        arc.stream(&mut self.root_bone)?;
        arc.stream(&mut self.tags)?;
        arc.stream_bytes(&mut self.thumbnail)
    }
}

pub const DEFAULT_FALLOFF: f32 = 0.5;

/// Config whose `falloff` field was added in version 1.
#[derive(Debug, Clone, PartialEq)]
pub struct CoarticulationConfig {
    pub name: String,
    pub strength: f32,
    pub falloff: f32,
}

impl Default for CoarticulationConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            strength: 1.0,
            falloff: DEFAULT_FALLOFF,
        }
    }
}

impl ArchiveClass for CoarticulationConfig {
    const CLASS_NAME: &'static str = "CoarticulationConfig";
    const VERSION: u16 = 1;

    fn serialize(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        let version = arc.serialize_class_version(Self::CLASS_NAME)?;
        arc.stream(&mut self.name)?;
        arc.stream(&mut self.strength)?;
        if version >= 1 {
            arc.stream(&mut self.falloff)?;
        } else if arc.is_loading() {
            self.falloff = DEFAULT_FALLOFF;
        }
        Ok(())
    }
}

/// Non-polymorphic root holding a list of actors.
#[derive(Default)]
pub struct Scene {
    pub title: String,
    pub actors: Vec<Option<ObjectRef>>,
    pub config: Option<ObjectRef>,
}

impl Streamable for Scene {
    fn stream(&mut self, arc: &mut Archive<'_>) -> Result<()> {
        arc.serialize_type_version("Scene", 0)?;
        arc.stream(&mut self.title)?;
        arc.stream(&mut self.actors)?;
        arc.stream(&mut self.config)
    }
}

// ============================================================================
// Registries
// ============================================================================

pub fn registry() -> Arc<ClassRegistry> {
    let registry = ClassRegistry::new();
    registry.register::<Bone>();
    registry.register::<IkBone>();
    registry.register::<Actor>();
    registry.register::<CoarticulationConfig>();
    Arc::new(registry)
}

/// Registry that writes [`CoarticulationConfig`] in its version 0 layout.
pub fn registry_with_config_v0() -> Arc<ClassRegistry> {
    let registry = ClassRegistry::new();
    registry.register::<Bone>();
    registry.register::<IkBone>();
    registry.register::<Actor>();
    registry.register_desc(ClassDesc::of::<CoarticulationConfig>().with_version(0));
    Arc::new(registry)
}

// ============================================================================
// Graphs
// ============================================================================

pub fn bone(name: &str, length: f32, parent: Option<&ObjectRef>) -> ObjectRef {
    new_object(Bone {
        name: Name::from(name),
        length,
        parent: parent.cloned(),
        keys: vec![
            Key { time: 0.0, value: length },
            Key { time: 1.0, value: length * 2.0 },
        ],
    })
}

/// An actor with a small skeleton. Every bone after the root points at its
/// parent, so the root bone is referenced several times.
pub fn sample_actor() -> ObjectRef {
    let hips = bone("hips", 1.0, None);
    let spine = bone("spine", 0.8, Some(&hips));
    let head = bone("head", 0.3, Some(&spine));
    let arm = new_object(IkBone {
        bone: Bone {
            name: Name::from("arm"),
            length: 0.6,
            parent: Some(spine.clone()),
            keys: Vec::new(),
        },
        target: Some(head.clone()),
        weight: 0.75,
    });

    new_object(Actor {
        name: "Héloïse".to_string(),
        visible: true,
        scale: 1.25,
        bones: vec![Some(hips.clone()), Some(spine), Some(head), Some(arm), None],
        root_bone: Some(hips),
        tags: vec![Name::from("hero"), Name::from("rigged"), Name::from("hero")],
        thumbnail: (0u8..=255).collect(),
    })
}

pub fn sample_scene() -> Scene {
    Scene {
        title: "lipsync take 3".to_string(),
        actors: vec![Some(sample_actor()), None],
        config: Some(new_object(CoarticulationConfig {
            name: "default".to_string(),
            strength: 0.4,
            falloff: 0.9,
        })),
    }
}

// ============================================================================
// Comparison
// ============================================================================

/// Plain, comparable view of a bone.
#[derive(Debug, PartialEq)]
pub struct BoneView {
    pub class_name: &'static str,
    pub name: String,
    pub length: f32,
    pub parent: Option<String>,
    pub keys: Vec<Key>,
    pub ik: Option<(Option<String>, f64)>,
}

fn bone_of(obj: &ObjectRef) -> Option<BoneView> {
    let name_of = |o: &ObjectRef| bone_of(o).map(|b| b.name);
    if let Some(b) = downcast_ref::<Bone>(obj) {
        return Some(BoneView {
            class_name: Bone::CLASS_NAME,
            name: b.name.to_string(),
            length: b.length,
            parent: b.parent.as_ref().and_then(name_of),
            keys: b.keys.clone(),
            ik: None,
        });
    }
    let ik = downcast_ref::<IkBone>(obj)?;
    Some(BoneView {
        class_name: IkBone::CLASS_NAME,
        name: ik.bone.name.to_string(),
        length: ik.bone.length,
        parent: ik.bone.parent.as_ref().and_then(name_of),
        keys: ik.bone.keys.clone(),
        ik: Some((ik.target.as_ref().and_then(name_of), ik.weight)),
    })
}

/// Plain, comparable view of an actor.
#[derive(Debug, PartialEq)]
pub struct ActorView {
    pub name: String,
    pub visible: bool,
    pub scale: f64,
    pub bones: Vec<Option<BoneView>>,
    pub root_bone: Option<String>,
    pub tags: Vec<Name>,
    pub thumbnail: Vec<u8>,
}

pub fn actor_view(obj: &ObjectRef) -> ActorView {
    let actor = downcast_ref::<Actor>(obj).expect("not an actor");
    ActorView {
        name: actor.name.clone(),
        visible: actor.visible,
        scale: actor.scale,
        bones: actor.bones.iter().map(|b| b.as_ref().and_then(bone_of)).collect(),
        root_bone: actor.root_bone.as_ref().and_then(bone_of).map(|b| b.name),
        tags: actor.tags.clone(),
        thumbnail: actor.thumbnail.clone(),
    }
}

/// Plain, comparable view of a scene.
#[derive(Debug, PartialEq)]
pub struct SceneView {
    pub title: String,
    pub actors: Vec<Option<ActorView>>,
    pub config: Option<CoarticulationConfig>,
}

pub fn scene_view(scene: &Scene) -> SceneView {
    SceneView {
        title: scene.title.clone(),
        actors: scene.actors.iter().map(|a| a.as_ref().map(actor_view)).collect(),
        config: scene
            .config
            .as_ref()
            .and_then(|c| downcast_ref::<CoarticulationConfig>(c).map(|c| CoarticulationConfig::clone(&c))),
    }
}

/// Whether two optional references point at the same instance.
pub fn same(a: &Option<ObjectRef>, b: &Option<ObjectRef>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}
