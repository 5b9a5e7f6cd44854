use std::{
    collections::BTreeSet,
    path::Path,
    sync::Arc,
};
use three_d::CpuModel;
use three_d_asset::io::RawAssets;

use crate::animation::AnimationClip;
use crate::error::ViewerError;
use crate::fetch::{fetch_bytes, Progress};


/// A mesh primitive exposing blend-shape influence weights
#[derive(Debug, Clone, PartialEq)]
pub struct MorphMesh {
    pub name: String,
    pub target_count: usize,
}


/// What the viewer needs to know about a glTF document before handing it to the GPU
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelDescription {
    pub clips: Vec<AnimationClip>,
    pub morph_meshes: Vec<MorphMesh>,
    /// Materials with a colour/opacity texture, which get the alpha cutout fix
    pub textured_materials: Vec<String>,
    /// Relative URIs of external buffers and images
    pub external_uris: Vec<String>,
    /// Buffers and images carried inline as `data:` URIs
    pub embedded_uris: Vec<String>,
    pub primitive_count: usize,
}

impl ModelDescription {
    /// Parses a `.gltf` (JSON) or `.glb` document. External buffers are not read.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, ViewerError> {
        let gltf = gltf::Gltf::from_slice(bytes)?;
        Ok(Self::from_document(&gltf.document))
    }

    pub fn from_document(document: &gltf::Document) -> Self {
        let mut description = Self::default();

        let scene = document.default_scene().or_else(|| document.scenes().next());
        let mut textured = BTreeSet::new();
        if let Some(scene) = scene {
            for node in scene.nodes() {
                description.visit_node(&node, &mut textured);
            }
        }
        description.textured_materials = textured.into_iter().map(|(_, name)| name).collect();

        description.clips = document.animations()
            .map(|animation| {
                let duration = animation.channels()
                    .filter_map(|channel| accessor_max_scalar(&channel.sampler().input()))
                    .fold(0.0_f32, f32::max);
                let weight_tracks = animation.channels()
                    .filter(|c| c.target().property() == gltf::animation::Property::MorphTargetWeights)
                    .count();
                AnimationClip::new(
                    animation.name().map(str::to_string),
                    duration,
                    animation.channels().count(),
                )
                .with_weight_tracks(weight_tracks)
            })
            .collect();

        let buffers = document.buffers().filter_map(|b| match b.source() {
            gltf::buffer::Source::Uri(uri) => Some(uri),
            gltf::buffer::Source::Bin => None,
        });
        let images = document.images().filter_map(|i| match i.source() {
            gltf::image::Source::Uri { uri, .. } => Some(uri),
            gltf::image::Source::View { .. } => None,
        });
        let (embedded, external): (Vec<&str>, Vec<&str>) = buffers
            .chain(images)
            .partition(|uri| uri.starts_with("data:"));
        description.external_uris = external.into_iter().map(str::to_string).collect();
        description.embedded_uris = embedded.into_iter().map(str::to_string).collect();

        description
    }

    fn visit_node(&mut self, node: &gltf::Node, textured: &mut BTreeSet<(usize, String)>) {
        if let Some(mesh) = node.mesh() {
            for (i, primitive) in mesh.primitives().enumerate() {
                self.primitive_count += 1;

                let material = primitive.material();
                if let Some(index) = material.index() {
                    if material.pbr_metallic_roughness().base_color_texture().is_some() {
                        let name = material.name()
                            .map(str::to_string)
                            .unwrap_or_else(|| format!("material_{}", index));
                        textured.insert((index, name));
                    }
                }

                let target_count = primitive.morph_targets().len();
                if target_count > 0 {
                    let base = node.name().or(mesh.name()).unwrap_or("mesh");
                    let name = if mesh.primitives().len() > 1 {
                        format!("{}_{}", base, i)
                    } else {
                        base.to_string()
                    };
                    self.morph_meshes.push(MorphMesh { name, target_count });
                }
            }
        }
        for child in node.children() {
            self.visit_node(&child, textured);
        }
    }

    /// The only clip the viewer ever plays
    pub fn first_clip(&self) -> Option<&AnimationClip> {
        self.clips.first()
    }
}


/// Largest value of a scalar accessor, read from its `max` bound
fn accessor_max_scalar(accessor: &gltf::Accessor) -> Option<f32> {
    let max = accessor.max()?;
    let value = match max {
        gltf::json::Value::Array(values) => values.first()?.as_f64()?,
        other => other.as_f64()?,
    };
    Some(value as f32)
}


/// Resolves `uri` against the directory of `document_path`, with forward slashes
pub fn resolve_uri(document_path: &str, uri: &str) -> String {
    match Path::new(document_path).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            format!("{}/{}", dir.to_string_lossy().trim_end_matches('/'), uri)
        }
        _ => uri.to_string(),
    }
}


/// A fetched and decoded asset, ready for upload
pub struct LoadedModel {
    pub path: String,
    pub description: ModelDescription,
    pub cpu_model: CpuModel,
}


/// Fetches the glTF at `path` together with its external resources and decodes it
pub async fn load_model(path: &str) -> Result<LoadedModel, ViewerError> {
    tracing::info!("load_model(): loading {}", path);

    let bytes = fetch_bytes(path, |p| log_progress(path, p)).await?;
    let description = ModelDescription::from_slice(&bytes)?;

    let mut dependencies = Vec::with_capacity(description.external_uris.len());
    for uri in description.external_uris.iter() {
        let url = resolve_uri(path, uri);
        let dependency = fetch_bytes(&url, |p| log_progress(&url, p)).await?;
        dependencies.push((url, dependency));
    }

    decode_described(path, bytes, description, dependencies)
}


/// Decodes an already fetched document. `dependencies` are keyed by the
/// resolved URL of every external buffer and image.
pub fn decode_model(
    path: &str,
    bytes: Vec<u8>,
    dependencies: Vec<(String, Vec<u8>)>,
) -> Result<LoadedModel, ViewerError> {
    let description = ModelDescription::from_slice(&bytes)?;
    decode_described(path, bytes, description, dependencies)
}


fn decode_described(
    path: &str,
    bytes: Vec<u8>,
    description: ModelDescription,
    dependencies: Vec<(String, Vec<u8>)>,
) -> Result<LoadedModel, ViewerError> {
    tracing::info!(
        "decode_model(): {} primitives, {} clips, {} external and {} embedded resources",
        description.primitive_count,
        description.clips.len(),
        description.external_uris.len(),
        description.embedded_uris.len()
    );

    let mut raw_assets = RawAssets::new();
    for (url, dependency) in dependencies {
        raw_assets.insert(url, dependency);
    }
    for uri in description.embedded_uris.iter() {
        raw_assets.insert(uri, decode_data_uri(uri)?);
    }
    raw_assets.insert(path, bytes);

    let mut cpu_model: CpuModel = raw_assets
        .deserialize(path)
        .map_err(|e| ViewerError::Asset(e.to_string()))?;
    hold_final_pose(&mut cpu_model);

    Ok(LoadedModel {
        path: path.to_string(),
        description,
        cpu_model,
    })
}


/// Body of a `data:` URI
pub fn decode_data_uri(uri: &str) -> Result<Vec<u8>, ViewerError> {
    let url = data_url::DataUrl::process(uri)
        .map_err(|e| ViewerError::DataUri(format!("{:?}", e)))?;
    let (body, _) = url
        .decode_to_vec()
        .map_err(|e| ViewerError::DataUri(format!("{:?}", e)))?;
    Ok(body)
}


/// Stops key frames from wrapping at the end of their clip, so the clip's
/// last instant shows the final pose and not the first one.
pub fn hold_final_pose(cpu_model: &mut CpuModel) {
    for primitive in cpu_model.geometries.iter_mut() {
        for animation in primitive.animations.iter_mut() {
            for (_, key_frames) in animation.key_frames.iter_mut() {
                Arc::make_mut(key_frames).loop_time = None;
            }
        }
    }
}


fn log_progress(url: &str, progress: Progress) {
    match progress.fraction() {
        Some(f) => tracing::debug!("Loading {}: {:.0}%", url, f * 100.0),
        None => tracing::debug!("Loading {}: {} bytes", url, progress.loaded),
    }
}


#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Two meshes under one root: a textured, morphing petal and a plain stem,
    /// plus two clips of which only the first matters.
    pub(crate) const FLOWER_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [2] } ],
        "nodes": [
            { "name": "Petal", "mesh": 0 },
            { "name": "Stem", "mesh": 1 },
            { "name": "Flower", "children": [0, 1] }
        ],
        "meshes": [
            {
                "name": "PetalMesh",
                "primitives": [ {
                    "attributes": { "POSITION": 0 },
                    "material": 0,
                    "targets": [ { "POSITION": 0 }, { "POSITION": 0 } ]
                } ],
                "weights": [0.0, 0.0]
            },
            {
                "name": "StemMesh",
                "primitives": [ { "attributes": { "POSITION": 0 }, "material": 1 } ]
            }
        ],
        "materials": [
            { "name": "PetalMat", "pbrMetallicRoughness": { "baseColorTexture": { "index": 0 } } },
            { "name": "StemMat", "pbrMetallicRoughness": { "baseColorFactor": [0.1, 0.6, 0.1, 1.0] } }
        ],
        "textures": [ { "source": 0 } ],
        "images": [ { "uri": "petal.png" } ],
        "buffers": [ { "uri": "Flower.bin", "byteLength": 100 } ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 16 },
            { "buffer": 0, "byteOffset": 60, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 68, "byteLength": 32 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [2.0] },
            { "bufferView": 2, "componentType": 5126, "count": 4, "type": "SCALAR" },
            { "bufferView": 3, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [5.0] },
            { "bufferView": 4, "componentType": 5126, "count": 2, "type": "VEC4" }
        ],
        "animations": [
            {
                "name": "Bloom",
                "channels": [ { "sampler": 0, "target": { "node": 0, "path": "weights" } } ],
                "samplers": [ { "input": 1, "output": 2 } ]
            },
            {
                "name": "Wilt",
                "channels": [ { "sampler": 0, "target": { "node": 1, "path": "rotation" } } ],
                "samplers": [ { "input": 3, "output": 4 } ]
            }
        ]
    }"#;

    /// A triangle slid from x=0 to x=1 over 2s, with its buffer inline
    pub(crate) const SLIDE_GLTF: &str = r#"{
        "asset": { "version": "2.0" },
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "name": "Slider", "mesh": 0 } ],
        "meshes": [ { "primitives": [ { "attributes": { "POSITION": 0 } } ] } ],
        "buffers": [ {
            "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAACAPwAAAAAAAAAAAAAAAAAAgD8AAAAAAAAAAAAAAEAAAAAAAAAAAAAAAAAAAIA/AAAAAAAAAAA=",
            "byteLength": 68
        } ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 36 },
            { "buffer": 0, "byteOffset": 36, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 44, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
              "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "SCALAR",
              "min": [0.0], "max": [2.0] },
            { "bufferView": 2, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "animations": [ {
            "name": "Slide",
            "channels": [ { "sampler": 0, "target": { "node": 0, "path": "translation" } } ],
            "samplers": [ { "input": 1, "output": 2 } ]
        } ]
    }"#;

    fn slide_x(model: &LoadedModel, time: f32) -> f32 {
        model.cpu_model.geometries[0].animations[0].transformation(time).w.x
    }

    #[test]
    fn test_describes_clips_in_order() {
        let d = ModelDescription::from_slice(FLOWER_GLTF.as_bytes()).unwrap();
        assert_eq!(d.clips.len(), 2);
        let first = d.first_clip().unwrap();
        assert_eq!(first.name.as_deref(), Some("Bloom"));
        assert_eq!(first.duration, 2.0);
        assert_eq!(first.track_count, 1);
        assert_eq!(d.clips[1].duration, 5.0);
    }

    #[test]
    fn test_collects_morph_meshes_only() {
        let d = ModelDescription::from_slice(FLOWER_GLTF.as_bytes()).unwrap();
        assert_eq!(d.primitive_count, 2);
        assert_eq!(
            d.morph_meshes,
            vec![MorphMesh { name: "Petal".to_string(), target_count: 2 }]
        );
    }

    #[test]
    fn test_only_textured_materials_are_fixed() {
        let d = ModelDescription::from_slice(FLOWER_GLTF.as_bytes()).unwrap();
        assert_eq!(d.textured_materials, vec!["PetalMat".to_string()]);
    }

    #[test]
    fn test_lists_external_resources() {
        let d = ModelDescription::from_slice(FLOWER_GLTF.as_bytes()).unwrap();
        assert_eq!(d.external_uris, vec!["Flower.bin".to_string(), "petal.png".to_string()]);
    }

    #[test]
    fn test_document_without_animations() {
        let json = r#"{ "asset": { "version": "2.0" }, "scenes": [ { "nodes": [] } ] }"#;
        let d = ModelDescription::from_slice(json.as_bytes()).unwrap();
        assert!(d.first_clip().is_none());
        assert!(d.morph_meshes.is_empty());
        assert_eq!(d.primitive_count, 0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(
            ModelDescription::from_slice(b"not a model"),
            Err(ViewerError::Gltf(_))
        ));
    }

    #[test]
    fn test_resolve_uri() {
        assert_eq!(resolve_uri("Flower11/Flower11.gltf", "Flower11.bin"), "Flower11/Flower11.bin");
        assert_eq!(resolve_uri("a/b/scene.gltf", "tex/petal.png"), "a/b/tex/petal.png");
        assert_eq!(resolve_uri("scene.gltf", "scene.bin"), "scene.bin");
    }

    #[test]
    fn test_morph_only_clips_are_flagged() {
        let d = ModelDescription::from_slice(FLOWER_GLTF.as_bytes()).unwrap();
        assert!(d.clips[0].is_morph_only());
        assert!(!d.clips[1].is_morph_only());
    }

    #[test]
    fn test_inline_buffers_are_embedded_not_fetched() {
        let d = ModelDescription::from_slice(SLIDE_GLTF.as_bytes()).unwrap();
        assert!(d.external_uris.is_empty());
        assert_eq!(d.embedded_uris.len(), 1);
        assert_eq!(decode_data_uri(&d.embedded_uris[0]).unwrap().len(), 68);
    }

    #[test]
    fn test_decode_data_uri() {
        assert_eq!(decode_data_uri("data:,Hello%20World!").unwrap(), b"Hello World!");
        assert_eq!(decode_data_uri("data:text/plain;base64,AAEC").unwrap(), vec![0, 1, 2]);
        assert!(matches!(decode_data_uri("Flower.bin"), Err(ViewerError::DataUri(_))));
    }

    #[test]
    fn test_decodes_self_contained_document() {
        let model = decode_model("Slide/Slide.gltf", SLIDE_GLTF.as_bytes().to_vec(), Vec::new()).unwrap();
        assert_eq!(model.cpu_model.geometries.len(), 1);
        assert_eq!(model.description.first_clip().unwrap().duration, 2.0);
    }

    #[test]
    fn test_clip_end_holds_final_pose() {
        let model = decode_model("Slide/Slide.gltf", SLIDE_GLTF.as_bytes().to_vec(), Vec::new()).unwrap();
        assert!(slide_x(&model, 0.0).abs() < 1e-6);
        assert!((slide_x(&model, 1.0) - 0.5).abs() < 1e-5);
        assert!((slide_x(&model, 2.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_dependency_fails_to_decode() {
        let result = decode_model("Flower11/Flower11.gltf", FLOWER_GLTF.as_bytes().to_vec(), Vec::new());
        assert!(matches!(result, Err(ViewerError::Asset(_))));
    }
}
