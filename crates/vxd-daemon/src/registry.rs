//! Method registry & dispatcher (§4.4): maps a method name to a handler,
//! enforces the reserved `rpc.*` prefix and the project-lock policy, and
//! routes mutating/engine methods through the worker pool.

use std::sync::Arc;

use serde_json::Value;
use uuid::Uuid;

use vxd_core::{Coord, DaemonError, DaemonResult, Engine, Rgba};

use crate::codec::{Request, Response};
use crate::color::parse_color;
use crate::context::DaemonContext;
use crate::workers::Priority;

/// Methods that mutate the active project and therefore require the
/// project lock (§4.4). `create_layer`, `load_project`, `save_project`,
/// `export_project`, and `render_to_file` are not named in the policy
/// list but plainly mutate shared engine/render state, so they are
/// included here too (see DESIGN.md).
const MUTATING_METHODS: &[&str] = &[
    "create_project",
    "load_project",
    "save_project",
    "add_voxel",
    "remove_voxel",
    "paint_voxel",
    "flood_fill",
    "procedural_shape",
    "create_layer",
    "delete_layer",
    "merge_layers",
    "set_layer_visibility",
    "export_project",
    "render_to_file",
    "batch_operations",
    "execute_script",
];

const INLINE_METHODS: &[&str] = &["echo", "version", "status", "list_methods"];

const ENGINE_METHODS: &[&str] = &[
    "create_project",
    "load_project",
    "save_project",
    "add_voxel",
    "remove_voxel",
    "get_voxel",
    "paint_voxel",
    "flood_fill",
    "procedural_shape",
    "create_layer",
    "delete_layer",
    "merge_layers",
    "set_layer_visibility",
    "get_layer_count",
    "list_layers",
    "get_project_bounds",
    "is_read_only",
    "export_project",
    "render_to_file",
    "bulk_get_voxels_region",
    "bulk_get_layer_voxels",
    "bulk_get_bounding_box",
    "color_histogram",
    "find_voxels_by_color",
    "unique_colors",
    "execute_script",
    "batch_operations",
];

fn requires_lock(method: &str) -> bool {
    MUTATING_METHODS.contains(&method)
}

enum HandlerClass {
    Inline,
    Engine,
}

fn classify(method: &str) -> Option<HandlerClass> {
    if INLINE_METHODS.contains(&method) {
        Some(HandlerClass::Inline)
    } else if ENGINE_METHODS.contains(&method) {
        Some(HandlerClass::Engine)
    } else {
        None
    }
}

/// Dispatch one already-parsed request against `ctx`, returning the
/// response to serialize. Callers are responsible for suppressing the
/// response entirely when `request.is_notification()`.
pub async fn dispatch(ctx: &Arc<DaemonContext>, request: &Request) -> Response {
    ctx.lifecycle.touch_activity();

    if request.method.starts_with("rpc.") {
        return Response::error(
            request.id.clone().unwrap_or(Value::Null),
            &DaemonError::InvalidRequest("reserved method prefix 'rpc.'".into()),
        );
    }

    match classify(&request.method) {
        None => Response::error(request.id.clone().unwrap_or(Value::Null), &DaemonError::MethodNotFound(request.method.clone())),
        Some(HandlerClass::Inline) => match inline_handle(ctx, &request.method, &request.params) {
            Ok(result) => Response::success(request.id.clone().unwrap_or(Value::Null), &result),
            Err(e) => Response::error(request.id.clone().unwrap_or(Value::Null), &e),
        },
        Some(HandlerClass::Engine) => match engine_dispatch(ctx, &request.method, &request.params, &request.id).await {
            Ok(result) => Response::success(request.id.clone().unwrap_or(Value::Null), &result),
            Err(e) => Response::error(request.id.clone().unwrap_or(Value::Null), &e),
        },
    }
}

fn inline_handle(ctx: &DaemonContext, method: &str, params: &Value) -> DaemonResult<Value> {
    match method {
        "echo" => Ok(params.clone()),
        "version" => Ok(serde_json::json!({ "version": env!("CARGO_PKG_VERSION") })),
        "status" => Ok(serde_json::json!({
            "state": format!("{:?}", ctx.lifecycle.state()),
            "pid": std::process::id(),
            "idle_for_secs": ctx.lifecycle.idle_for().as_secs(),
            "lock_holder": ctx.lock.holder(),
            "general_pool": pool_stats_json(&ctx.general_pool.stats()),
            "script_pool": pool_stats_json(&ctx.script_pool.stats()),
        })),
        "list_methods" => {
            let mut names: Vec<&str> = INLINE_METHODS.iter().chain(ENGINE_METHODS.iter()).copied().collect();
            names.sort_unstable();
            names.dedup();
            Ok(serde_json::json!(names))
        }
        other => Err(DaemonError::MethodNotFound(other.to_owned())),
    }
}

fn pool_stats_json(stats: &crate::workers::PoolStats) -> Value {
    serde_json::json!({
        "processed": stats.processed,
        "failed": stats.failed,
        "queue_depth": stats.queue_depth,
        "avg_latency_micros": stats.avg_latency_micros,
    })
}

async fn engine_dispatch(
    ctx: &Arc<DaemonContext>,
    method: &str,
    params: &Value,
    request_id: &Option<Value>,
) -> DaemonResult<Value> {
    let tag = request_id
        .as_ref()
        .map_or_else(|| Uuid::new_v4().to_string(), |v| v.to_string());

    let locked = if requires_lock(method) {
        if !ctx.lock.acquire(&tag) {
            return Err(DaemonError::LockBusy);
        }
        true
    } else {
        false
    };

    let result = run_engine_method(ctx, method, params).await;

    if locked {
        ctx.lock.release();
    }

    result
}

async fn run_engine_method(ctx: &Arc<DaemonContext>, method: &str, params: &Value) -> DaemonResult<Value> {
    if method == "create_project" {
        ctx.reset_engine()?;
    }

    if method == "execute_script" {
        return run_script(ctx, params).await;
    }
    if method == "batch_operations" {
        return run_batch(ctx, params).await;
    }
    if method == "render_to_file" {
        return run_render(ctx, params).await;
    }

    let (ctx, method, params) = (Arc::clone(ctx), method.to_owned(), params.clone());
    submit_to_pool(&ctx.general_pool, move || dispatch_engine_method(ctx.engine.as_ref(), &method, &params)).await
}

async fn run_script(ctx: &Arc<DaemonContext>, params: &Value) -> DaemonResult<Value> {
    let p = Params(params);
    let name = p.opt_str("name", 1).unwrap_or_else(|| "script".to_owned());
    let code = p.opt_str("code", 0);
    let path = p.opt_str("path", 0);

    let (ctx2, name2) = (Arc::clone(ctx), name);
    submit_to_pool(&ctx.script_pool, move || {
        if let Some(code) = code {
            ctx2.script_engine.run_from_string(&code, &name2)
        } else if let Some(path) = path {
            ctx2.script_engine.run_from_file(&path)
        } else {
            Err(DaemonError::MissingField("code or path".into()))
        }
    })
    .await
}

async fn run_batch(ctx: &Arc<DaemonContext>, params: &Value) -> DaemonResult<Value> {
    let operations = params
        .get("operations")
        .or_else(|| params.as_array().map(|_| params))
        .ok_or_else(|| DaemonError::MissingField("operations".into()))?
        .as_array()
        .ok_or_else(|| DaemonError::InvalidParams("operations must be an array".into()))?
        .clone();

    let (ctx2, operations2) = (Arc::clone(ctx), operations);
    submit_to_pool(&ctx.general_pool, move || {
        let mut results = Vec::with_capacity(operations2.len());
        for op in &operations2 {
            let method = op
                .get("method")
                .and_then(Value::as_str)
                .ok_or_else(|| DaemonError::MissingField("method".into()))?;
            let op_params = op.get("params").cloned().unwrap_or(Value::Null);
            results.push(dispatch_engine_method(ctx2.engine.as_ref(), method, &op_params)?);
        }
        Ok(Value::Array(results))
    })
    .await
}

async fn run_render(ctx: &Arc<DaemonContext>, params: &Value) -> DaemonResult<Value> {
    let p = Params(params);
    let width = p.u32("width", 1)?;
    let height = p.u32("height", 2)?;
    let format = p.opt_str("format", 3).unwrap_or_else(|| "png".to_owned());
    let quality = p.opt_u32("quality", 4).unwrap_or(90);
    let session_id = p.opt_str("session_id", 5);

    let (ctx2, format2, session2) = (Arc::clone(ctx), format.clone(), session_id.clone());
    submit_to_pool(&ctx.general_pool, move || {
        let path = ctx2.render.create_path(session2.as_deref(), &format2);
        let path_str = path.to_string_lossy().into_owned();
        ctx2.engine
            .render_to_file(&path_str, width, height, &format2, u8::try_from(quality).unwrap_or(90))?;
        ctx2.render
            .register(path.clone(), session2, format2.clone(), width, height)?;
        Ok(serde_json::json!({ "path": path_str, "format": format2, "width": width, "height": height }))
    })
    .await
}

async fn submit_to_pool<F>(pool: &crate::workers::WorkerPool, job: F) -> DaemonResult<Value>
where
    F: FnOnce() -> DaemonResult<Value> + Send + 'static,
{
    let (tx, rx) = tokio::sync::oneshot::channel();
    pool.submit(Priority::Normal, move |_worker_id| {
        let _ = tx.send(job());
    })?;
    rx.await.map_err(|_| DaemonError::Internal("worker dropped result channel".into()))?
}

/// Dispatch a single request directly against an engine, with no lock or
/// worker-pool involvement. Used both by `batch_operations`'s in-job loop
/// and by the script runtime's per-step dispatch.
///
/// # Errors
///
/// Returns [`DaemonError::MethodNotFound`] for any method outside the
/// engine table (render/script/batch are not steppable), and whatever the
/// engine call itself returns.
pub fn dispatch_engine_method(engine: &dyn Engine, method: &str, params: &Value) -> DaemonResult<Value> {
    let p = Params(params);
    match method {
        "create_project" => {
            let info = engine.create_project(&p.str("name", 0)?, p.u32("width", 1)?, p.u32("height", 2)?, p.u32("depth", 3)?)?;
            Ok(project_info_json(&info))
        }
        "load_project" => {
            let info = engine.load_project(&p.str("path", 0)?)?;
            Ok(project_info_json(&info))
        }
        "save_project" => {
            engine.save_project(&p.str("path", 0)?)?;
            Ok(serde_json::json!({ "success": true }))
        }
        "add_voxel" => {
            let coord = p.coord()?;
            let color = p.color_flat("color", 3)?;
            engine.add_voxel(coord, color, &p.opt_str("layer", 7).unwrap_or_else(|| "default".into()))?;
            Ok(serde_json::json!({
                "success": true,
                "x": coord.0, "y": coord.1, "z": coord.2,
                "color": [color.r, color.g, color.b, color.a],
            }))
        }
        "remove_voxel" => {
            let coord = p.coord()?;
            engine.remove_voxel(coord, &p.opt_str("layer", 3).unwrap_or_else(|| "default".into()))?;
            Ok(serde_json::json!({ "success": true, "x": coord.0, "y": coord.1, "z": coord.2 }))
        }
        "get_voxel" => {
            let found = engine.get_voxel(p.coord()?)?;
            Ok(match found {
                Some(c) => serde_json::json!({ "exists": true, "color": [c.r, c.g, c.b, c.a] }),
                None => serde_json::json!({ "exists": false, "color": null }),
            })
        }
        "paint_voxel" => {
            let coord = p.coord()?;
            let color = p.color_flat("color", 3)?;
            engine.paint_voxel(coord, color, &p.opt_str("layer", 7).unwrap_or_else(|| "default".into()))?;
            Ok(serde_json::json!({
                "success": true,
                "x": coord.0, "y": coord.1, "z": coord.2,
                "color": [color.r, color.g, color.b, color.a],
            }))
        }
        "flood_fill" => {
            let filled = engine.flood_fill(p.coord()?, p.color_flat("color", 3)?, &p.opt_str("layer", 7).unwrap_or_else(|| "default".into()))?;
            Ok(serde_json::json!({ "success": true, "filled": filled }))
        }
        "procedural_shape" => {
            let count = engine.procedural_shape(
                &p.str("shape", 0)?,
                p.coord_at(1)?,
                p.u32("size", 4)?,
                p.color_flat("color", 5)?,
                &p.opt_str("layer", 9).unwrap_or_else(|| "default".into()),
            )?;
            Ok(serde_json::json!({ "success": true, "placed": count }))
        }
        "create_layer" => {
            engine.create_layer(&p.str("name", 0)?, p.opt_color("color", 1).unwrap_or(Rgba::new(255, 255, 255, 255)), p.opt_bool("visible", 2).unwrap_or(true))?;
            Ok(serde_json::json!({ "success": true }))
        }
        "delete_layer" => {
            engine.delete_layer(&p.str("name", 0)?)?;
            Ok(serde_json::json!({ "success": true }))
        }
        "merge_layers" => {
            engine.merge_layers(&p.str("src", 0)?, &p.str("dst", 1)?)?;
            Ok(serde_json::json!({ "success": true }))
        }
        "set_layer_visibility" => {
            engine.set_layer_visibility(&p.str("name", 0)?, p.bool("visible", 1)?)?;
            Ok(serde_json::json!({ "success": true }))
        }
        "get_layer_count" => Ok(serde_json::json!(engine.get_layer_count()?)),
        "list_layers" => Ok(serde_json::json!(engine.list_layers()?)),
        "get_project_bounds" => {
            let (w, h, d) = engine.get_project_bounds()?;
            Ok(serde_json::json!({ "width": w, "height": h, "depth": d }))
        }
        "is_read_only" => Ok(Value::Bool(engine.is_read_only())),
        "export_project" => {
            engine.export_project(&p.str("path", 0)?, p.opt_str("format", 1).as_deref())?;
            Ok(serde_json::json!({ "success": true }))
        }
        "bulk_get_voxels_region" => {
            let voxels = engine.bulk_get_voxels_region(p.coord_named("min")?, p.coord_named("max")?)?;
            Ok(voxels_json(&voxels))
        }
        "bulk_get_layer_voxels" => {
            let voxels = engine.bulk_get_layer_voxels(&p.str("layer", 0)?)?;
            Ok(voxels_json(&voxels))
        }
        "bulk_get_bounding_box" => Ok(engine.bulk_get_bounding_box()?.map_or(Value::Null, |(min, max)| {
            serde_json::json!({ "min": coord_json(min), "max": coord_json(max) })
        })),
        "color_histogram" => {
            let histogram = engine.color_histogram()?;
            Ok(Value::Array(
                histogram
                    .iter()
                    .map(|c| serde_json::json!({ "color": rgba_json(c.color), "count": c.count }))
                    .collect(),
            ))
        }
        "find_voxels_by_color" => {
            let coords = engine.find_voxels_by_color(p.color("color", 0)?)?;
            Ok(Value::Array(coords.into_iter().map(coord_json).collect()))
        }
        "unique_colors" => Ok(Value::Array(engine.unique_colors()?.into_iter().map(rgba_json).collect())),
        "reset" => {
            engine.reset()?;
            Ok(serde_json::json!({ "success": true }))
        }
        other => Err(DaemonError::MethodNotFound(other.to_owned())),
    }
}

fn project_info_json(info: &vxd_core::ProjectInfo) -> Value {
    serde_json::json!({
        "success": true,
        "name": info.name, "width": info.width, "height": info.height, "depth": info.depth,
    })
}

fn rgba_json(c: Rgba) -> Value {
    serde_json::json!({ "r": c.r, "g": c.g, "b": c.b, "a": c.a })
}

fn coord_json(c: Coord) -> Value {
    serde_json::json!([c.0, c.1, c.2])
}

fn voxels_json(voxels: &[(Coord, Rgba)]) -> Value {
    Value::Array(
        voxels
            .iter()
            .map(|(coord, color)| serde_json::json!({ "coord": coord_json(*coord), "color": rgba_json(*color) }))
            .collect(),
    )
}

/// Thin accessor over params that may be a named object or a positional
/// array, matching §4.4's "parameter access is positional or named".
struct Params<'a>(&'a Value);

impl Params<'_> {
    fn field(&self, name: &str, index: usize) -> Option<&Value> {
        match self.0 {
            Value::Object(map) => map.get(name),
            Value::Array(items) => items.get(index),
            _ => None,
        }
    }

    fn require(&self, name: &str, index: usize) -> DaemonResult<&Value> {
        self.field(name, index).ok_or_else(|| DaemonError::MissingField(name.to_owned()))
    }

    fn str(&self, name: &str, index: usize) -> DaemonResult<String> {
        self.require(name, index)?
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| DaemonError::InvalidParams(format!("{name} must be a string")))
    }

    fn opt_str(&self, name: &str, index: usize) -> Option<String> {
        self.field(name, index).and_then(Value::as_str).map(str::to_owned)
    }

    fn u32(&self, name: &str, index: usize) -> DaemonResult<u32> {
        self.require(name, index)?
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| DaemonError::InvalidParams(format!("{name} must be a non-negative integer")))
    }

    fn opt_u32(&self, name: &str, index: usize) -> Option<u32> {
        self.field(name, index).and_then(Value::as_u64).and_then(|n| u32::try_from(n).ok())
    }

    fn bool(&self, name: &str, index: usize) -> DaemonResult<bool> {
        self.require(name, index)?
            .as_bool()
            .ok_or_else(|| DaemonError::InvalidParams(format!("{name} must be a boolean")))
    }

    fn opt_bool(&self, name: &str, index: usize) -> Option<bool> {
        self.field(name, index).and_then(Value::as_bool)
    }

    fn color(&self, name: &str, index: usize) -> DaemonResult<Rgba> {
        parse_color(self.require(name, index)?)
    }

    fn opt_color(&self, name: &str, index: usize) -> Option<Rgba> {
        self.field(name, index).and_then(|v| parse_color(v).ok())
    }

    /// Like `color`, but when params are positional, reads four flattened
    /// consecutive elements (r, g, b, a) starting at `index` instead of a
    /// single nested color value — this is the wire shape `spec.md` §8's
    /// literal `add_voxel` scenario sends (`[x,y,z,r,g,b,a,layer]`). Named
    /// params are unaffected: `color` is still looked up as one field.
    fn color_flat(&self, name: &str, index: usize) -> DaemonResult<Rgba> {
        match self.0 {
            Value::Array(items) => {
                let slice = items.get(index..index + 4).ok_or_else(|| {
                    DaemonError::InvalidParams(format!("{name} requires 4 positional components (r,g,b,a)"))
                })?;
                parse_color(&Value::Array(slice.to_vec()))
            }
            _ => self.color(name, index),
        }
    }

    fn coord(&self) -> DaemonResult<Coord> {
        self.coord_at(0)
    }

    /// Like `coord`, but for positional params whose x/y/z don't start at
    /// index 0 (e.g. `procedural_shape`'s `shape` occupies index 0).
    fn coord_at(&self, start: usize) -> DaemonResult<Coord> {
        let x = self.i32("x", start)?;
        let y = self.i32("y", start + 1)?;
        let z = self.i32("z", start + 2)?;
        Ok((x, y, z))
    }

    fn coord_named(&self, name: &str) -> DaemonResult<Coord> {
        let value = self.require(name, 0)?;
        let items = value
            .as_array()
            .ok_or_else(|| DaemonError::InvalidParams(format!("{name} must be a 3-element array")))?;
        if items.len() != 3 {
            return Err(DaemonError::InvalidParams(format!("{name} must be a 3-element array")));
        }
        let get = |i: usize| -> DaemonResult<i32> {
            items[i]
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| DaemonError::InvalidParams(format!("{name}[{i}] must be an integer")))
        };
        Ok((get(0)?, get(1)?, get(2)?))
    }

    fn i32(&self, name: &str, index: usize) -> DaemonResult<i32> {
        self.require(name, index)?
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(|| DaemonError::InvalidParams(format!("{name} must be an integer")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Request;
    use vxd_config::Config;
    use vxd_core::InMemoryEngine;

    fn new_context() -> (Arc<DaemonContext>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.base_dir = dir.path().to_path_buf();
        (Arc::new(DaemonContext::with_engine(config, Arc::new(InMemoryEngine::new()))), dir)
    }

    #[tokio::test]
    async fn echo_round_trips_params() {
        let (ctx, _dir) = new_context();
        let request = Request {
            method: "echo".into(),
            params: serde_json::json!({"msg": "hi"}),
            id: Some(serde_json::json!(1)),
        };
        let response = dispatch(&ctx, &request).await;
        let bytes = response.to_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"msg\":\"hi\""));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn reserved_prefix_is_rejected() {
        let (ctx, _dir) = new_context();
        let request = Request { method: "rpc.x".into(), params: Value::Null, id: Some(serde_json::json!(1)) };
        let response = dispatch(&ctx, &request).await;
        let text = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert!(text.contains("-32600"));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn unknown_method_is_method_not_found() {
        let (ctx, _dir) = new_context();
        let request = Request { method: "nope".into(), params: Value::Null, id: Some(serde_json::json!(1)) };
        let response = dispatch(&ctx, &request).await;
        let text = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert!(text.contains("-32601"));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn create_project_then_add_voxel_round_trips() {
        let (ctx, _dir) = new_context();
        let create = Request {
            method: "create_project".into(),
            params: serde_json::json!({"name": "s", "width": 8, "height": 8, "depth": 8}),
            id: Some(serde_json::json!(1)),
        };
        let response = dispatch(&ctx, &create).await;
        assert!(String::from_utf8(response.to_bytes().unwrap()).unwrap().contains("\"result\""));

        let add = Request {
            method: "add_voxel".into(),
            params: serde_json::json!({"x": 1, "y": 2, "z": 3, "color": [255, 0, 0]}),
            id: Some(serde_json::json!(2)),
        };
        let response = dispatch(&ctx, &add).await;
        assert!(String::from_utf8(response.to_bytes().unwrap()).unwrap().contains("\"result\""));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn literal_positional_scenario_from_spec_matches_exactly() {
        let (ctx, _dir) = new_context();
        let create = Request {
            method: "create_project".into(),
            params: serde_json::json!(["P", 8, 8, 8]),
            id: Some(serde_json::json!(10)),
        };
        let response = dispatch(&ctx, &create).await;
        let text = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert!(text.contains(r#""success":true"#));
        assert!(text.contains(r#""name":"P""#));
        assert!(text.contains(r#""width":8"#));
        assert!(text.contains(r#""height":8"#));
        assert!(text.contains(r#""depth":8"#));

        // x, y, z, r, g, b, a, layer all flattened into one positional array.
        let add = Request {
            method: "add_voxel".into(),
            params: serde_json::json!([1, 2, 3, 255, 0, 0, 255, 0]),
            id: Some(serde_json::json!(11)),
        };
        let response = dispatch(&ctx, &add).await;
        let text = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert!(text.contains(r#""success":true"#));
        assert!(text.contains(r#""x":1"#));
        assert!(text.contains(r#""y":2"#));
        assert!(text.contains(r#""z":3"#));
        assert!(text.contains(r#""color":[255,0,0,255]"#));

        let get = Request {
            method: "get_voxel".into(),
            params: serde_json::json!([1, 2, 3]),
            id: Some(serde_json::json!(12)),
        };
        let response = dispatch(&ctx, &get).await;
        let text = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert!(text.contains(r#""exists":true"#));
        assert!(text.contains(r#""color":[255,0,0,255]"#));
        ctx.shutdown().await;
    }

    #[tokio::test]
    async fn contended_lock_returns_busy_error() {
        let (ctx, _dir) = new_context();
        assert!(ctx.lock.acquire("someone-else"));
        let add = Request {
            method: "add_voxel".into(),
            params: serde_json::json!({"x": 0, "y": 0, "z": 0, "color": [1, 2, 3]}),
            id: Some(serde_json::json!(1)),
        };
        let response = dispatch(&ctx, &add).await;
        let text = String::from_utf8(response.to_bytes().unwrap()).unwrap();
        assert!(text.contains("another project operation is in progress"));
        ctx.shutdown().await;
    }
}
