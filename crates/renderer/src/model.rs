//! glTF model loading off the render thread.

use std::path::{Path, PathBuf};
use std::thread;

use bytemuck::{Pod, Zeroable};
use crossbeam_channel::{bounded, Receiver, TryRecvError};
use glam::{Mat3, Mat4, Vec3};

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct MeshVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

/// Indexed triangle list with per-vertex base colour.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<MeshVertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Axis-aligned bounds as `(min, max)`; `None` for an empty mesh.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let mut vertices = self.vertices.iter().map(|v| Vec3::from(v.position));
        let first = vertices.next()?;
        Some(vertices.fold((first, first), |(min, max), p| (min.min(p), max.max(p))))
    }

    /// Unit cube centred at the origin, one flat-shaded quad per face.
    pub fn cube(color: [f32; 3]) -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]),
            ([-1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 1.0, 0.0], [0.0, 0.0, -1.0], [1.0, 0.0, 0.0]),
            ([0.0, -1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, 1.0], [0.0, 1.0, 0.0], [1.0, 0.0, 0.0]),
            ([0.0, 0.0, -1.0], [0.0, 1.0, 0.0], [-1.0, 0.0, 0.0]),
        ];
        let mut mesh = MeshData::default();
        for (normal, up, right) in FACES {
            let n = Vec3::from(normal);
            let u = Vec3::from(up) * 0.5;
            let r = Vec3::from(right) * 0.5;
            let centre = n * 0.5;
            let base = mesh.vertices.len() as u32;
            for corner in [centre - r - u, centre + r - u, centre + r + u, centre - r + u] {
                mesh.vertices.push(MeshVertex {
                    position: corner.to_array(),
                    normal,
                    color,
                });
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }

    /// Appends `other` transformed by `transform`.
    fn append_transformed(&mut self, other: MeshData, transform: Mat4) {
        let normal_matrix = Mat3::from_mat4(transform).inverse().transpose();
        let base = self.vertices.len() as u32;
        self.vertices.extend(other.vertices.into_iter().map(|v| MeshVertex {
            position: transform.transform_point3(Vec3::from(v.position)).to_array(),
            normal: (normal_matrix * Vec3::from(v.normal))
                .normalize_or_zero()
                .to_array(),
            color: v.color,
        }));
        self.indices
            .extend(other.indices.into_iter().map(|index| index + base));
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to import glTF {path}: {source}")]
    Import {
        path: PathBuf,
        #[source]
        source: gltf::Error,
    },
    #[error("glTF {0} has no triangle geometry")]
    Empty(PathBuf),
    #[error("model loader thread exited before reporting")]
    Disconnected,
    #[error("failed to spawn model loader thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Reads every triangle primitive of the default scene into one mesh.
pub fn load_gltf(path: &Path) -> Result<MeshData, ModelLoadError> {
    let (document, buffers, _images) =
        gltf::import(path).map_err(|source| ModelLoadError::Import {
            path: path.to_path_buf(),
            source,
        })?;

    let mut mesh = MeshData::default();
    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next());
    if let Some(scene) = scene {
        for node in scene.nodes() {
            collect_node(&node, Mat4::IDENTITY, &buffers, &mut mesh);
        }
    }

    if mesh.is_empty() {
        return Err(ModelLoadError::Empty(path.to_path_buf()));
    }
    Ok(mesh)
}

fn collect_node(
    node: &gltf::Node<'_>,
    parent: Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut MeshData,
) {
    let transform = parent * Mat4::from_cols_array_2d(&node.transform().matrix());
    if let Some(mesh) = node.mesh() {
        for primitive in mesh.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                tracing::debug!(mode = ?primitive.mode(), "skipping non-triangle primitive");
                continue;
            }
            if let Some(part) = read_primitive(&primitive, buffers) {
                out.append_transformed(part, transform);
            }
        }
    }
    for child in node.children() {
        collect_node(&child, transform, buffers, out);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive<'_>,
    buffers: &[gltf::buffer::Data],
) -> Option<MeshData> {
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(|data| &data.0[..]));
    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    let base_color = primitive
        .material()
        .pbr_metallic_roughness()
        .base_color_factor();
    let tint = [base_color[0], base_color[1], base_color[2]];
    let colors: Option<Vec<[f32; 3]>> = reader
        .read_colors(0)
        .map(|colors| colors.into_rgb_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };
    let normals: Vec<[f32; 3]> = match reader.read_normals() {
        Some(normals) => normals.collect(),
        None => face_normals(&positions, &indices),
    };

    let vertices = positions
        .iter()
        .enumerate()
        .map(|(index, position)| {
            let vertex_color = colors
                .as_ref()
                .and_then(|colors| colors.get(index))
                .copied()
                .unwrap_or([1.0, 1.0, 1.0]);
            MeshVertex {
                position: *position,
                normal: normals.get(index).copied().unwrap_or([0.0, 1.0, 0.0]),
                color: [
                    tint[0] * vertex_color[0],
                    tint[1] * vertex_color[1],
                    tint[2] * vertex_color[2],
                ],
            }
        })
        .collect();

    Some(MeshData { vertices, indices })
}

/// Area-weighted vertex normals for primitives that ship without them.
fn face_normals(positions: &[[f32; 3]], indices: &[u32]) -> Vec<[f32; 3]> {
    let mut accum = vec![Vec3::ZERO; positions.len()];
    for triangle in indices.chunks_exact(3) {
        let [a, b, c] = [triangle[0], triangle[1], triangle[2]].map(|i| i as usize);
        if a >= positions.len() || b >= positions.len() || c >= positions.len() {
            continue;
        }
        let pa = Vec3::from(positions[a]);
        let normal = (Vec3::from(positions[b]) - pa).cross(Vec3::from(positions[c]) - pa);
        accum[a] += normal;
        accum[b] += normal;
        accum[c] += normal;
    }
    accum
        .into_iter()
        .map(|normal| normal.normalize_or_zero().to_array())
        .collect()
}

/// Spawns model loads on a worker thread.
pub struct ModelLoader;

impl ModelLoader {
    pub fn spawn(path: PathBuf) -> ModelFuture {
        let (tx, rx) = bounded(1);
        let spawn_path = path.clone();
        let spawned = thread::Builder::new()
            .name("asciiheader-model".into())
            .spawn(move || {
                let result = load_gltf(&spawn_path);
                let _ = tx.send(result);
            });
        match spawned {
            Ok(_) => ModelFuture {
                path,
                state: FutureState::Pending(rx),
            },
            Err(err) => ModelFuture {
                path,
                state: FutureState::Failed(Some(ModelLoadError::Spawn(err))),
            },
        }
    }
}

enum FutureState {
    Pending(Receiver<Result<MeshData, ModelLoadError>>),
    Failed(Option<ModelLoadError>),
    Done,
}

/// Handle to an in-flight model load, polled once per frame.
pub struct ModelFuture {
    path: PathBuf,
    state: FutureState,
}

impl ModelFuture {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the result once the worker finishes; `None` while pending or
    /// after the result has been taken.
    pub fn poll(&mut self) -> Option<Result<MeshData, ModelLoadError>> {
        match &mut self.state {
            FutureState::Pending(rx) => match rx.try_recv() {
                Ok(result) => {
                    self.state = FutureState::Done;
                    Some(result)
                }
                Err(TryRecvError::Empty) => None,
                Err(TryRecvError::Disconnected) => {
                    self.state = FutureState::Done;
                    Some(Err(ModelLoadError::Disconnected))
                }
            },
            FutureState::Failed(err) => {
                let err = err.take();
                self.state = FutureState::Done;
                err.map(Err)
            }
            FutureState::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self.state, FutureState::Done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn wait(future: &mut ModelFuture) -> Result<MeshData, ModelLoadError> {
        let deadline = Instant::now() + Duration::from_secs(10);
        loop {
            if let Some(result) = future.poll() {
                return result;
            }
            assert!(Instant::now() < deadline, "model load timed out");
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn cube_has_six_quads() {
        let cube = MeshData::cube([1.0, 1.0, 1.0]);
        assert_eq!(cube.vertices.len(), 24);
        assert_eq!(cube.triangle_count(), 12);
        let (min, max) = cube.bounds().unwrap();
        assert_eq!(min, Vec3::splat(-0.5));
        assert_eq!(max, Vec3::splat(0.5));
    }

    #[test]
    fn cube_faces_wind_outward() {
        let cube = MeshData::cube([1.0, 1.0, 1.0]);
        for triangle in cube.indices.chunks_exact(3) {
            let [a, b, c] = [triangle[0], triangle[1], triangle[2]]
                .map(|i| Vec3::from(cube.vertices[i as usize].position));
            let face = (b - a).cross(c - a).normalize();
            let normal = Vec3::from(cube.vertices[triangle[0] as usize].normal);
            assert!(face.dot(normal) > 0.99, "face {face:?} normal {normal:?}");
        }
    }

    #[test]
    fn missing_file_reports_import_error() {
        let mut future = ModelLoader::spawn(PathBuf::from("/nonexistent/model.glb"));
        let err = wait(&mut future).unwrap_err();
        assert!(matches!(err, ModelLoadError::Import { .. }));
        assert!(future.is_done());
        assert!(future.poll().is_none());
    }

    #[test]
    fn loads_gltf_with_external_buffer() {
        // One triangle; the position buffer sits beside the document.
        let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
        let bytes: Vec<u8> = positions.iter().flat_map(|v| v.to_le_bytes()).collect();
        let document = r#"{
  "asset": {"version": "2.0"},
  "scene": 0,
  "scenes": [{"nodes": [0]}],
  "nodes": [{"mesh": 0, "translation": [0.0, 0.0, 2.0]}],
  "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
  "buffers": [{"byteLength": 36, "uri": "triangle.bin"}],
  "bufferViews": [{"buffer": 0, "byteLength": 36}],
  "accessors": [{"bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3",
                 "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0]}]
}"#;
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("triangle.bin"), &bytes).unwrap();
        let path = dir.path().join("triangle.gltf");
        std::fs::write(&path, document).unwrap();

        let mesh = wait(&mut ModelLoader::spawn(path)).expect("load triangle");
        assert_eq!(mesh.triangle_count(), 1);
        assert_eq!(mesh.vertices[1].position, [1.0, 0.0, 2.0]);
        assert!((Vec3::from(mesh.vertices[0].normal) - Vec3::Z).length() < 1e-5);
        assert_eq!(mesh.vertices[0].color, [1.0, 1.0, 1.0]);
    }
}
