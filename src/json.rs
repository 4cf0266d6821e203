// Read-only JSON views for renderers and debugging tools.
use crate::algorithms::lazy_map::{NodeId, TilingMap};
use crate::geometry::math::Point;
use crate::model::{Connection, EdgeLength, GeometryKind, Slider, Tiling, Valence};
use serde::Serialize;
use serde_json::Value;

pub fn tiling_to_json(t: &Tiling) -> Value {
    #[derive(Serialize)]
    struct ShapeSer<'a> {
        id: usize,
        vertices: Vec<[f64; 3]>,
        angles: &'a [f64],
        edges: &'a [EdgeLength],
        connections: &'a [Connection],
        cycle_length: usize,
        repeat_value: usize,
        apeirogonal: bool,
        #[serde(skip_serializing_if = "<[_]>::is_empty")]
        valence: &'a [Valence],
        #[serde(skip_serializing_if = "<[_]>::is_empty")]
        sublines: &'a [(usize, usize)],
        line: bool,
        pseudohept: bool,
    }
    #[derive(Serialize)]
    struct IntSliderSer<'a> {
        name: &'a str,
        current: i64,
        min: i64,
        max: i64,
    }
    #[derive(Serialize)]
    struct Doc<'a> {
        name: &'a str,
        comment: &'a str,
        geometry: GeometryKind,
        order: u64,
        shapes: Vec<ShapeSer<'a>>,
        sliders: &'a [Slider],
        intsliders: Vec<IntSliderSer<'a>>,
        options: &'a [String],
        min_valence: Option<Valence>,
        max_valence: Option<Valence>,
        cscale: f64,
        range: i64,
        floor_scale: f64,
        boundary_ratio: f64,
    }
    let shapes = t
        .shapes
        .iter()
        .map(|s| ShapeSer {
            id: s.id,
            vertices: s.vertices.iter().map(|p| [p.x, p.y, p.z]).collect(),
            angles: &s.angles,
            edges: &s.edges,
            connections: &s.connections,
            cycle_length: s.cycle_length,
            repeat_value: s.repeat_value,
            apeirogonal: s.apeirogonal,
            valence: &s.vertex_valence,
            sublines: &s.sublines,
            line: s.line,
            pseudohept: s.pseudohept,
        })
        .collect();
    let doc = Doc {
        name: &t.name,
        comment: &t.comment,
        geometry: t.geometry,
        order: t.order,
        shapes,
        sliders: &t.sliders,
        intsliders: t.intsliders.iter().map(|s| IntSliderSer { name: &s.name, current: s.current, min: s.min, max: s.max }).collect(),
        options: &t.options,
        min_valence: t.min_valence,
        max_valence: t.max_valence,
        cscale: t.cscale,
        range: t.range,
        floor_scale: t.floor_scale,
        boundary_ratio: t.boundary_ratio,
    };
    serde_json::to_value(doc).unwrap_or(Value::Null)
}

/// Placed polygons of the given map nodes, vertices in absolute model coordinates.
pub fn nodes_to_json(map: &TilingMap, nodes: &[NodeId]) -> Value {
    #[derive(Serialize)]
    struct NodeSer {
        id: NodeId,
        shape: usize,
        distance: usize,
        parity: bool,
        vertices: Vec<Point>,
    }
    let out: Vec<NodeSer> = nodes
        .iter()
        .filter_map(|&id| {
            let node = map.node(id)?;
            let m = map.motion(id)?;
            let sh = map.tiling().shapes.get(node.shape)?;
            Some(NodeSer {
                id,
                shape: node.shape,
                distance: node.distance,
                parity: node.parity,
                vertices: sh.vertices.iter().map(|&v| m * v).collect(),
            })
        })
        .collect();
    serde_json::to_value(out).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tes::load_str;

    #[test]
    fn export_lists_shapes_and_valences() {
        let t = load_str("## grid\ne2. angleunit(deg) tile(1,90,*4) c(0,0,0,2,0)").unwrap();
        let v = tiling_to_json(&t);
        assert_eq!(v["name"], "grid");
        assert_eq!(v["geometry"], "euclidean");
        assert_eq!(v["shapes"][0]["vertices"].as_array().map(|a| a.len()), Some(4));
        assert_eq!(v["shapes"][0]["edges"][0]["kind"], "finite");
        assert!(v["shapes"][0]["valence"].is_array());
    }

    #[test]
    fn node_export_skips_unknown_ids() {
        let t = load_str("e2. angleunit(deg) tile(1,90,*4) c(0,0,0,2,0)").unwrap();
        let mut map = TilingMap::new(t).unwrap();
        let nodes = map.expand(1).unwrap();
        let v = nodes_to_json(&map, &[nodes[0], 999]);
        assert_eq!(v.as_array().map(|a| a.len()), Some(1));
        assert_eq!(v[0]["distance"], 0);
    }
}
