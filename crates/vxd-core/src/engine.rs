//! The voxel editing engine and scripting runtime, treated as narrow
//! external collaborators.
//!
//! The daemon core never inlines the heavy editing logic (the sparse voxel
//! storage, layer compositing, rendering, import/export codecs); it only
//! calls through the [`Engine`] and [`ScriptEngine`] capability interfaces
//! below. [`InMemoryEngine`] is the reference collaborator the daemon ships
//! with — a minimal, process-wide voxel store sufficient to exercise every
//! operation the dispatcher knows how to route, not a production editor.

use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::{DaemonError, DaemonResult};

/// RGBA color, components in `0..=255`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgba {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba {
    /// Build a color, defaulting to 255 is left to the caller.
    #[must_use]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// As a 4-element array in `[r, g, b, a]` order.
    #[must_use]
    pub const fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// Integer voxel coordinate.
pub type Coord = (i32, i32, i32);

/// A named layer of voxels.
#[derive(Debug, Clone)]
pub struct Layer {
    /// Layer name.
    pub name: String,
    /// Default color for the layer (informational; voxels carry their own).
    pub color: Rgba,
    /// Whether the layer renders.
    pub visible: bool,
    /// Voxels owned by this layer.
    pub voxels: HashMap<Coord, Rgba>,
}

impl Layer {
    fn new(name: impl Into<String>, color: Rgba, visible: bool) -> Self {
        Self {
            name: name.into(),
            color,
            visible,
            voxels: HashMap::new(),
        }
    }
}

/// The project currently open in the engine, if any.
#[derive(Debug, Clone)]
pub struct ProjectInfo {
    /// Project name.
    pub name: String,
    /// Bounding width.
    pub width: u32,
    /// Bounding height.
    pub height: u32,
    /// Bounding depth.
    pub depth: u32,
}

/// A fully decoded color histogram bucket.
#[derive(Debug, Clone)]
pub struct ColorCount {
    /// The color.
    pub color: Rgba,
    /// Number of voxels with that color.
    pub count: u64,
}

/// The narrow interface the daemon uses to drive the voxel editing engine.
///
/// Every method here corresponds 1:1 to an `Engine` RPC method in the
/// method registry. Mutating methods are only ever called while the caller
/// holds the process-wide project lock; the trait itself assumes nothing
/// about concurrency beyond `Send + Sync`.
pub trait Engine: Send + Sync {
    /// Discard any open project and tool/layer/render caches, then start a
    /// fresh project of the given bounds. Used both for `create_project`
    /// and for the complete-reset performed before it (§4.4).
    fn create_project(&self, name: &str, w: u32, h: u32, d: u32) -> DaemonResult<ProjectInfo>;

    /// Load a project from an on-disk path. The reference engine treats
    /// this as unsupported (no real file format is specified here).
    fn load_project(&self, path: &str) -> DaemonResult<ProjectInfo>;

    /// Save the current project to an on-disk path.
    fn save_project(&self, path: &str) -> DaemonResult<()>;

    /// Set a voxel's color in `layer` (by name), creating the layer if this
    /// is the first voxel ever placed in it via the default layer.
    fn add_voxel(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<()>;

    /// Remove a voxel, if present. Removing an absent voxel is not an error.
    fn remove_voxel(&self, coord: Coord, layer: &str) -> DaemonResult<()>;

    /// Look up a voxel's color, if it exists, searching visible layers
    /// top-down.
    fn get_voxel(&self, coord: Coord) -> DaemonResult<Option<Rgba>>;

    /// Alias for `add_voxel` used by "paint" semantics (overwrite existing).
    fn paint_voxel(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<()>;

    /// Flood-fill starting at `coord` with `color`, confined to `layer`,
    /// replacing every orthogonally connected voxel matching the seed color.
    fn flood_fill(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<u64>;

    /// Stamp a named procedural shape (`"cube"`, `"sphere"`) of the given
    /// size centered at `coord`.
    fn procedural_shape(
        &self,
        shape: &str,
        coord: Coord,
        size: u32,
        color: Rgba,
        layer: &str,
    ) -> DaemonResult<u64>;

    /// Create a new layer.
    fn create_layer(&self, name: &str, color: Rgba, visible: bool) -> DaemonResult<()>;

    /// Delete a layer by name.
    fn delete_layer(&self, name: &str) -> DaemonResult<()>;

    /// Merge `src` into `dst`, removing `src`.
    fn merge_layers(&self, src: &str, dst: &str) -> DaemonResult<()>;

    /// Set a layer's visibility.
    fn set_layer_visibility(&self, name: &str, visible: bool) -> DaemonResult<()>;

    /// Number of layers in the current project.
    fn get_layer_count(&self) -> DaemonResult<usize>;

    /// List layer names in creation order.
    fn list_layers(&self) -> DaemonResult<Vec<String>>;

    /// The project's bounding dimensions.
    fn get_project_bounds(&self) -> DaemonResult<(u32, u32, u32)>;

    /// Whether the engine is in a read-only state (no project open).
    fn is_read_only(&self) -> bool;

    /// Export the project to `path` in an optional format.
    fn export_project(&self, path: &str, format: Option<&str>) -> DaemonResult<()>;

    /// Render the scene to `path`. Returns the actual bytes written so the
    /// caller can register a checksum with the render manager.
    #[allow(clippy::too_many_arguments)]
    fn render_to_file(
        &self,
        path: &str,
        width: u32,
        height: u32,
        format: &str,
        quality: u8,
    ) -> DaemonResult<Vec<u8>>;

    /// All voxels within an axis-aligned region.
    fn bulk_get_voxels_region(
        &self,
        min: Coord,
        max: Coord,
    ) -> DaemonResult<Vec<(Coord, Rgba)>>;

    /// All voxels belonging to a single layer.
    fn bulk_get_layer_voxels(&self, layer: &str) -> DaemonResult<Vec<(Coord, Rgba)>>;

    /// The tight bounding box of all non-empty voxels.
    fn bulk_get_bounding_box(&self) -> DaemonResult<Option<(Coord, Coord)>>;

    /// Color histogram across the whole project.
    fn color_histogram(&self) -> DaemonResult<Vec<ColorCount>>;

    /// Coordinates of every voxel matching `color` exactly.
    fn find_voxels_by_color(&self, color: Rgba) -> DaemonResult<Vec<Coord>>;

    /// The set of distinct colors used in the project.
    fn unique_colors(&self) -> DaemonResult<Vec<Rgba>>;

    /// Reset all engine-owned process-wide state. Called both by the
    /// pre-create-project reset and by the project lock's idle sweeper.
    fn reset(&self) -> DaemonResult<()>;
}

/// The embedded scripting runtime, treated as a single-threaded executor.
pub trait ScriptEngine: Send + Sync {
    /// Execute `code` (a script body), with `name` used for error
    /// attribution.
    fn run_from_string(&self, code: &str, name: &str) -> DaemonResult<serde_json::Value>;

    /// Execute a script loaded from an on-disk path.
    fn run_from_file(&self, path: &str) -> DaemonResult<serde_json::Value>;
}

#[derive(Debug, Default)]
struct EngineState {
    project: Option<ProjectInfo>,
    layers: Vec<Layer>,
}

impl EngineState {
    fn layer_mut(&mut self, name: &str) -> DaemonResult<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| DaemonError::LayerMissing(name.to_owned()))
    }

    fn layer_mut_or_create(&mut self, name: &str) -> &mut Layer {
        if let Some(idx) = self.layers.iter().position(|l| l.name == name) {
            return &mut self.layers[idx];
        }
        self.layers
            .push(Layer::new(name, Rgba::new(255, 255, 255, 255), true));
        self.layers.last_mut().expect("just pushed")
    }
}

/// Reference in-process implementation of [`Engine`].
///
/// Holds one project's worth of state behind a single `RwLock`; every
/// mutating call is made while the project lock (see `vxd-daemon::lock`)
/// is held by the caller, so contention here is expected to be rare and is
/// handled with a plain lock rather than anything lock-free.
pub struct InMemoryEngine {
    state: RwLock<EngineState>,
}

impl Default for InMemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEngine {
    /// Construct an engine with no project open.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(EngineState::default()),
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, EngineState> {
        self.state.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, EngineState> {
        self.state.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl Engine for InMemoryEngine {
    fn create_project(&self, name: &str, w: u32, h: u32, d: u32) -> DaemonResult<ProjectInfo> {
        let mut st = self.write();
        st.layers.clear();
        st.layers.push(Layer::new("default", Rgba::new(255, 255, 255, 255), true));
        let info = ProjectInfo {
            name: name.to_owned(),
            width: w,
            height: h,
            depth: d,
        };
        st.project = Some(info.clone());
        Ok(info)
    }

    fn load_project(&self, path: &str) -> DaemonResult<ProjectInfo> {
        Err(DaemonError::Engine(format!(
            "load_project unsupported by reference engine: {path}"
        )))
    }

    fn save_project(&self, path: &str) -> DaemonResult<()> {
        let st = self.read();
        if st.project.is_none() {
            return Err(DaemonError::Engine("no project open".into()));
        }
        std::fs::write(path, b"").map_err(|e| DaemonError::Filesystem(e.to_string()))
    }

    fn add_voxel(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<()> {
        let mut st = self.write();
        if st.project.is_none() {
            return Err(DaemonError::Engine("no project open".into()));
        }
        st.layer_mut_or_create(layer).voxels.insert(coord, color);
        Ok(())
    }

    fn remove_voxel(&self, coord: Coord, layer: &str) -> DaemonResult<()> {
        let mut st = self.write();
        st.layer_mut(layer)?.voxels.remove(&coord);
        Ok(())
    }

    fn get_voxel(&self, coord: Coord) -> DaemonResult<Option<Rgba>> {
        let st = self.read();
        for layer in st.layers.iter().rev() {
            if !layer.visible {
                continue;
            }
            if let Some(c) = layer.voxels.get(&coord) {
                return Ok(Some(*c));
            }
        }
        Ok(None)
    }

    fn paint_voxel(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<()> {
        self.add_voxel(coord, color, layer)
    }

    fn flood_fill(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<u64> {
        let mut st = self.write();
        let seed = st.layer_mut(layer)?.voxels.get(&coord).copied();
        let mut stack = vec![coord];
        let mut visited = std::collections::HashSet::new();
        let mut painted = 0u64;
        while let Some(c) = stack.pop() {
            if !visited.insert(c) {
                continue;
            }
            let current = st.layer_mut(layer)?.voxels.get(&c).copied();
            if current != seed {
                continue;
            }
            st.layer_mut(layer)?.voxels.insert(c, color);
            painted += 1;
            let (x, y, z) = c;
            for d in [
                (x + 1, y, z),
                (x - 1, y, z),
                (x, y + 1, z),
                (x, y - 1, z),
                (x, y, z + 1),
                (x, y, z - 1),
            ] {
                if !visited.contains(&d) {
                    stack.push(d);
                }
            }
        }
        Ok(painted)
    }

    fn procedural_shape(
        &self,
        shape: &str,
        coord: Coord,
        size: u32,
        color: Rgba,
        layer: &str,
    ) -> DaemonResult<u64> {
        let mut st = self.write();
        if st.project.is_none() {
            return Err(DaemonError::Engine("no project open".into()));
        }
        let radius = i32::try_from(size).unwrap_or(i32::MAX);
        let mut count = 0u64;
        let target = st.layer_mut_or_create(layer);
        match shape {
            "cube" => {
                let (cx, cy, cz) = coord;
                for x in cx..cx + radius {
                    for y in cy..cy + radius {
                        for z in cz..cz + radius {
                            target.voxels.insert((x, y, z), color);
                            count += 1;
                        }
                    }
                }
            }
            "sphere" => {
                let (cx, cy, cz) = coord;
                for x in -radius..=radius {
                    for y in -radius..=radius {
                        for z in -radius..=radius {
                            if x * x + y * y + z * z <= radius * radius {
                                target.voxels.insert((cx + x, cy + y, cz + z), color);
                                count += 1;
                            }
                        }
                    }
                }
            }
            other => return Err(DaemonError::ShapeUnsupported(other.to_owned())),
        }
        Ok(count)
    }

    fn create_layer(&self, name: &str, color: Rgba, visible: bool) -> DaemonResult<()> {
        let mut st = self.write();
        if st.layers.iter().any(|l| l.name == name) {
            return Err(DaemonError::Engine(format!("layer already exists: {name}")));
        }
        st.layers.push(Layer::new(name, color, visible));
        Ok(())
    }

    fn delete_layer(&self, name: &str) -> DaemonResult<()> {
        let mut st = self.write();
        let before = st.layers.len();
        st.layers.retain(|l| l.name != name);
        if st.layers.len() == before {
            return Err(DaemonError::LayerMissing(name.to_owned()));
        }
        Ok(())
    }

    fn merge_layers(&self, src: &str, dst: &str) -> DaemonResult<()> {
        let mut st = self.write();
        let src_voxels = st.layer_mut(src)?.voxels.clone();
        st.layer_mut(dst)?.voxels.extend(src_voxels);
        st.layers.retain(|l| l.name != src);
        Ok(())
    }

    fn set_layer_visibility(&self, name: &str, visible: bool) -> DaemonResult<()> {
        self.write().layer_mut(name)?.visible = visible;
        Ok(())
    }

    fn get_layer_count(&self) -> DaemonResult<usize> {
        Ok(self.read().layers.len())
    }

    fn list_layers(&self) -> DaemonResult<Vec<String>> {
        Ok(self.read().layers.iter().map(|l| l.name.clone()).collect())
    }

    fn get_project_bounds(&self) -> DaemonResult<(u32, u32, u32)> {
        let st = self.read();
        let p = st
            .project
            .as_ref()
            .ok_or_else(|| DaemonError::Engine("no project open".into()))?;
        Ok((p.width, p.height, p.depth))
    }

    fn is_read_only(&self) -> bool {
        self.read().project.is_none()
    }

    fn export_project(&self, path: &str, _format: Option<&str>) -> DaemonResult<()> {
        self.save_project(path)
    }

    fn render_to_file(
        &self,
        path: &str,
        width: u32,
        height: u32,
        _format: &str,
        _quality: u8,
    ) -> DaemonResult<Vec<u8>> {
        let st = self.read();
        if st.project.is_none() {
            return Err(DaemonError::Engine("no project open".into()));
        }
        let pixel_count = usize::try_from(width.saturating_mul(height)).unwrap_or(usize::MAX);
        let bytes = vec![0u8; pixel_count.saturating_mul(4)];
        std::fs::write(path, &bytes).map_err(|e| DaemonError::Filesystem(e.to_string()))?;
        Ok(bytes)
    }

    fn bulk_get_voxels_region(&self, min: Coord, max: Coord) -> DaemonResult<Vec<(Coord, Rgba)>> {
        let st = self.read();
        let mut out = Vec::new();
        for layer in &st.layers {
            for (&coord, &color) in &layer.voxels {
                let (x, y, z) = coord;
                if x >= min.0 && x <= max.0 && y >= min.1 && y <= max.1 && z >= min.2 && z <= max.2
                {
                    out.push((coord, color));
                }
            }
        }
        Ok(out)
    }

    fn bulk_get_layer_voxels(&self, layer: &str) -> DaemonResult<Vec<(Coord, Rgba)>> {
        let st = self.read();
        Ok(st
            .layers
            .iter()
            .find(|l| l.name == layer)
            .ok_or_else(|| DaemonError::LayerMissing(layer.to_owned()))?
            .voxels
            .iter()
            .map(|(&c, &rgba)| (c, rgba))
            .collect())
    }

    fn bulk_get_bounding_box(&self) -> DaemonResult<Option<(Coord, Coord)>> {
        let st = self.read();
        let mut bounds: Option<(Coord, Coord)> = None;
        for layer in &st.layers {
            for &(x, y, z) in layer.voxels.keys() {
                bounds = Some(match bounds {
                    None => ((x, y, z), (x, y, z)),
                    Some(((minx, miny, minz), (maxx, maxy, maxz))) => (
                        (minx.min(x), miny.min(y), minz.min(z)),
                        (maxx.max(x), maxy.max(y), maxz.max(z)),
                    ),
                });
            }
        }
        Ok(bounds)
    }

    fn color_histogram(&self) -> DaemonResult<Vec<ColorCount>> {
        let st = self.read();
        let mut counts: HashMap<[u8; 4], u64> = HashMap::new();
        for layer in &st.layers {
            for color in layer.voxels.values() {
                *counts.entry(color.to_array()).or_insert(0) += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|(arr, count)| ColorCount {
                color: Rgba::new(arr[0], arr[1], arr[2], arr[3]),
                count,
            })
            .collect())
    }

    fn find_voxels_by_color(&self, color: Rgba) -> DaemonResult<Vec<Coord>> {
        let st = self.read();
        Ok(st
            .layers
            .iter()
            .flat_map(|l| l.voxels.iter())
            .filter(|(_, &c)| c == color)
            .map(|(&coord, _)| coord)
            .collect())
    }

    fn unique_colors(&self) -> DaemonResult<Vec<Rgba>> {
        let st = self.read();
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for layer in &st.layers {
            for &color in layer.voxels.values() {
                if seen.insert(color.to_array()) {
                    out.push(color);
                }
            }
        }
        Ok(out)
    }

    fn reset(&self) -> DaemonResult<()> {
        let mut st = self.write();
        st.project = None;
        st.layers.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_add_then_get_voxel() {
        let engine = InMemoryEngine::new();
        engine.create_project("P", 8, 8, 8).unwrap();
        engine
            .add_voxel((1, 2, 3), Rgba::new(255, 0, 0, 255), "default")
            .unwrap();
        let got = engine.get_voxel((1, 2, 3)).unwrap();
        assert_eq!(got, Some(Rgba::new(255, 0, 0, 255)));
    }

    #[test]
    fn remove_absent_voxel_is_not_an_error() {
        let engine = InMemoryEngine::new();
        engine.create_project("P", 4, 4, 4).unwrap();
        assert!(engine.remove_voxel((9, 9, 9), "default").is_ok());
    }

    #[test]
    fn reset_clears_project_and_layers() {
        let engine = InMemoryEngine::new();
        engine.create_project("P", 4, 4, 4).unwrap();
        engine.add_voxel((0, 0, 0), Rgba::new(1, 2, 3, 4), "default").unwrap();
        engine.reset().unwrap();
        assert!(engine.is_read_only());
        assert_eq!(engine.get_layer_count().unwrap(), 0);
    }

    #[test]
    fn merge_layers_moves_voxels() {
        let engine = InMemoryEngine::new();
        engine.create_project("P", 4, 4, 4).unwrap();
        engine.create_layer("top", Rgba::new(0, 0, 0, 255), true).unwrap();
        engine.add_voxel((1, 1, 1), Rgba::new(9, 9, 9, 255), "top").unwrap();
        engine.merge_layers("top", "default").unwrap();
        assert_eq!(engine.list_layers().unwrap(), vec!["default".to_owned()]);
        assert_eq!(
            engine.get_voxel((1, 1, 1)).unwrap(),
            Some(Rgba::new(9, 9, 9, 255))
        );
    }

    #[test]
    fn delete_missing_layer_errors() {
        let engine = InMemoryEngine::new();
        engine.create_project("P", 4, 4, 4).unwrap();
        assert!(matches!(
            engine.delete_layer("nope"),
            Err(DaemonError::LayerMissing(_))
        ));
    }

    #[test]
    fn procedural_cube_fills_expected_voxel_count() {
        let engine = InMemoryEngine::new();
        engine.create_project("P", 16, 16, 16).unwrap();
        let n = engine
            .procedural_shape("cube", (0, 0, 0), 2, Rgba::new(1, 1, 1, 255), "default")
            .unwrap();
        assert_eq!(n, 8);
    }
}
