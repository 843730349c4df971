//! Mock implementations of the engine collaborator traits for testing the
//! daemon's dispatch and concurrency layers without the reference engine's
//! behavior getting in the way.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

use vxd_core::{ColorCount, Coord, DaemonError, DaemonResult, Engine, ProjectInfo, Rgba, ScriptEngine};

/// Wraps an [`vxd_core::InMemoryEngine`] and counts how many times each kind
/// of call landed, so dispatch tests can assert on call volume without
/// asserting on voxel contents.
pub struct MockEngine {
    inner: vxd_core::InMemoryEngine,
    calls: AtomicUsize,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    /// Build a mock with a fresh, empty reference engine underneath.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: vxd_core::InMemoryEngine::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// Total number of `Engine` trait methods invoked so far.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl Engine for MockEngine {
    fn create_project(&self, name: &str, w: u32, h: u32, d: u32) -> DaemonResult<ProjectInfo> {
        self.tick();
        self.inner.create_project(name, w, h, d)
    }

    fn load_project(&self, path: &str) -> DaemonResult<ProjectInfo> {
        self.tick();
        self.inner.load_project(path)
    }

    fn save_project(&self, path: &str) -> DaemonResult<()> {
        self.tick();
        self.inner.save_project(path)
    }

    fn add_voxel(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<()> {
        self.tick();
        self.inner.add_voxel(coord, color, layer)
    }

    fn remove_voxel(&self, coord: Coord, layer: &str) -> DaemonResult<()> {
        self.tick();
        self.inner.remove_voxel(coord, layer)
    }

    fn get_voxel(&self, coord: Coord) -> DaemonResult<Option<Rgba>> {
        self.tick();
        self.inner.get_voxel(coord)
    }

    fn paint_voxel(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<()> {
        self.tick();
        self.inner.paint_voxel(coord, color, layer)
    }

    fn flood_fill(&self, coord: Coord, color: Rgba, layer: &str) -> DaemonResult<u64> {
        self.tick();
        self.inner.flood_fill(coord, color, layer)
    }

    fn procedural_shape(
        &self,
        shape: &str,
        coord: Coord,
        size: u32,
        color: Rgba,
        layer: &str,
    ) -> DaemonResult<u64> {
        self.tick();
        self.inner.procedural_shape(shape, coord, size, color, layer)
    }

    fn create_layer(&self, name: &str, color: Rgba, visible: bool) -> DaemonResult<()> {
        self.tick();
        self.inner.create_layer(name, color, visible)
    }

    fn delete_layer(&self, name: &str) -> DaemonResult<()> {
        self.tick();
        self.inner.delete_layer(name)
    }

    fn merge_layers(&self, src: &str, dst: &str) -> DaemonResult<()> {
        self.tick();
        self.inner.merge_layers(src, dst)
    }

    fn set_layer_visibility(&self, name: &str, visible: bool) -> DaemonResult<()> {
        self.tick();
        self.inner.set_layer_visibility(name, visible)
    }

    fn get_layer_count(&self) -> DaemonResult<usize> {
        self.tick();
        self.inner.get_layer_count()
    }

    fn list_layers(&self) -> DaemonResult<Vec<String>> {
        self.tick();
        self.inner.list_layers()
    }

    fn get_project_bounds(&self) -> DaemonResult<(u32, u32, u32)> {
        self.tick();
        self.inner.get_project_bounds()
    }

    fn is_read_only(&self) -> bool {
        self.tick();
        self.inner.is_read_only()
    }

    fn export_project(&self, path: &str, format: Option<&str>) -> DaemonResult<()> {
        self.tick();
        self.inner.export_project(path, format)
    }

    fn render_to_file(
        &self,
        path: &str,
        width: u32,
        height: u32,
        format: &str,
        quality: u8,
    ) -> DaemonResult<Vec<u8>> {
        self.tick();
        self.inner.render_to_file(path, width, height, format, quality)
    }

    fn bulk_get_voxels_region(&self, min: Coord, max: Coord) -> DaemonResult<Vec<(Coord, Rgba)>> {
        self.tick();
        self.inner.bulk_get_voxels_region(min, max)
    }

    fn bulk_get_layer_voxels(&self, layer: &str) -> DaemonResult<Vec<(Coord, Rgba)>> {
        self.tick();
        self.inner.bulk_get_layer_voxels(layer)
    }

    fn bulk_get_bounding_box(&self) -> DaemonResult<Option<(Coord, Coord)>> {
        self.tick();
        self.inner.bulk_get_bounding_box()
    }

    fn color_histogram(&self) -> DaemonResult<Vec<ColorCount>> {
        self.tick();
        self.inner.color_histogram()
    }

    fn find_voxels_by_color(&self, color: Rgba) -> DaemonResult<Vec<Coord>> {
        self.tick();
        self.inner.find_voxels_by_color(color)
    }

    fn unique_colors(&self) -> DaemonResult<Vec<Rgba>> {
        self.tick();
        self.inner.unique_colors()
    }

    fn reset(&self) -> DaemonResult<()> {
        self.tick();
        self.inner.reset()
    }
}

/// An `Engine` that fails every mutating call with a fixed error, used to
/// test that dispatch/error-mapping code surfaces engine failures rather
/// than panicking or silently swallowing them.
#[derive(Debug, Default)]
pub struct FailingEngine;

macro_rules! fail {
    () => {
        Err(DaemonError::Engine("mock engine failure".into()))
    };
}

impl Engine for FailingEngine {
    fn create_project(&self, _name: &str, _w: u32, _h: u32, _d: u32) -> DaemonResult<ProjectInfo> {
        fail!()
    }

    fn load_project(&self, _path: &str) -> DaemonResult<ProjectInfo> {
        fail!()
    }

    fn save_project(&self, _path: &str) -> DaemonResult<()> {
        fail!()
    }

    fn add_voxel(&self, _coord: Coord, _color: Rgba, _layer: &str) -> DaemonResult<()> {
        fail!()
    }

    fn remove_voxel(&self, _coord: Coord, _layer: &str) -> DaemonResult<()> {
        fail!()
    }

    fn get_voxel(&self, _coord: Coord) -> DaemonResult<Option<Rgba>> {
        fail!()
    }

    fn paint_voxel(&self, _coord: Coord, _color: Rgba, _layer: &str) -> DaemonResult<()> {
        fail!()
    }

    fn flood_fill(&self, _coord: Coord, _color: Rgba, _layer: &str) -> DaemonResult<u64> {
        fail!()
    }

    fn procedural_shape(
        &self,
        _shape: &str,
        _coord: Coord,
        _size: u32,
        _color: Rgba,
        _layer: &str,
    ) -> DaemonResult<u64> {
        fail!()
    }

    fn create_layer(&self, _name: &str, _color: Rgba, _visible: bool) -> DaemonResult<()> {
        fail!()
    }

    fn delete_layer(&self, _name: &str) -> DaemonResult<()> {
        fail!()
    }

    fn merge_layers(&self, _src: &str, _dst: &str) -> DaemonResult<()> {
        fail!()
    }

    fn set_layer_visibility(&self, _name: &str, _visible: bool) -> DaemonResult<()> {
        fail!()
    }

    fn get_layer_count(&self) -> DaemonResult<usize> {
        fail!()
    }

    fn list_layers(&self) -> DaemonResult<Vec<String>> {
        fail!()
    }

    fn get_project_bounds(&self) -> DaemonResult<(u32, u32, u32)> {
        fail!()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn export_project(&self, _path: &str, _format: Option<&str>) -> DaemonResult<()> {
        fail!()
    }

    fn render_to_file(
        &self,
        _path: &str,
        _width: u32,
        _height: u32,
        _format: &str,
        _quality: u8,
    ) -> DaemonResult<Vec<u8>> {
        fail!()
    }

    fn bulk_get_voxels_region(&self, _min: Coord, _max: Coord) -> DaemonResult<Vec<(Coord, Rgba)>> {
        fail!()
    }

    fn bulk_get_layer_voxels(&self, _layer: &str) -> DaemonResult<Vec<(Coord, Rgba)>> {
        fail!()
    }

    fn bulk_get_bounding_box(&self) -> DaemonResult<Option<(Coord, Coord)>> {
        fail!()
    }

    fn color_histogram(&self) -> DaemonResult<Vec<ColorCount>> {
        fail!()
    }

    fn find_voxels_by_color(&self, _color: Rgba) -> DaemonResult<Vec<Coord>> {
        fail!()
    }

    fn unique_colors(&self) -> DaemonResult<Vec<Rgba>> {
        fail!()
    }

    fn reset(&self) -> DaemonResult<()> {
        fail!()
    }
}

/// A `ScriptEngine` that echoes the script body back as a JSON string,
/// recording every invocation for assertions.
#[derive(Debug, Default)]
pub struct MockScriptEngine {
    runs: Mutex<Vec<String>>,
}

impl MockScriptEngine {
    /// Build an empty mock.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `name`/path passed to a run so far, in call order.
    #[must_use]
    pub fn runs(&self) -> Vec<String> {
        self.runs.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

impl ScriptEngine for MockScriptEngine {
    fn run_from_string(&self, code: &str, name: &str) -> DaemonResult<serde_json::Value> {
        if let Ok(mut guard) = self.runs.lock() {
            guard.push(name.to_owned());
        }
        Ok(serde_json::json!({ "echo": code }))
    }

    fn run_from_file(&self, path: &str) -> DaemonResult<serde_json::Value> {
        if let Ok(mut guard) = self.runs.lock() {
            guard.push(path.to_owned());
        }
        Ok(serde_json::json!({ "ran": path }))
    }
}

/// A `ScriptEngine` that always fails, named after the error it returns.
#[derive(Debug, Default)]
pub struct FailingScriptEngine;

impl ScriptEngine for FailingScriptEngine {
    fn run_from_string(&self, _code: &str, name: &str) -> DaemonResult<serde_json::Value> {
        Err(DaemonError::Engine(format!("script failed: {name}")))
    }

    fn run_from_file(&self, path: &str) -> DaemonResult<serde_json::Value> {
        Err(DaemonError::Engine(format!("script failed: {path}")))
    }
}

/// Arc-wrap any `Engine` for handing shared ownership to a dispatcher under
/// test.
#[must_use]
pub fn shared<E: Engine + 'static>(engine: E) -> Arc<dyn Engine> {
    Arc::new(engine)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mock_engine_counts_calls() {
        let engine = MockEngine::new();
        engine.create_project("p", 4, 4, 4).unwrap();
        engine.is_read_only();
        assert_eq!(engine.call_count(), 2);
    }

    #[test]
    fn failing_engine_fails_every_mutation() {
        let engine = FailingEngine;
        assert!(engine.create_project("p", 1, 1, 1).is_err());
        assert!(engine.reset().is_err());
    }

    #[test]
    fn mock_script_engine_records_runs() {
        let script = MockScriptEngine::new();
        script.run_from_string("1+1", "inline").unwrap();
        script.run_from_file("/tmp/x.script").unwrap();
        assert_eq!(script.runs(), vec!["inline", "/tmp/x.script"]);
    }

    #[test]
    fn failing_script_engine_reports_the_name() {
        let script = FailingScriptEngine;
        let err = script.run_from_string("x", "bad").unwrap_err();
        assert!(matches!(err, DaemonError::Engine(msg) if msg.contains("bad")));
    }
}
