// Orientable double cover: removes mirrored gluings by doubling every shape.
use crate::model::{EdgeLength, Tiling};
use tracing::info;

/// Replace a tiling with mirrored connections by its orientable double cover.
/// Shapes `s..2s` are the mirror images of shapes `0..s`. No-op without mirrors.
pub fn unmirror(t: &mut Tiling) {
    t.mirror_rules = t.shapes.iter().flat_map(|s| &s.connections).filter(|c| c.mirror).count();
    if t.mirror_rules == 0 {
        return;
    }
    let s = t.shapes.len();
    let copies: Vec<_> = t.shapes.clone();
    t.shapes.extend(copies);
    for (i, sh) in t.shapes.iter_mut().enumerate() {
        sh.id = i;
    }
    for sh in &mut t.shapes[s..] {
        for v in &mut sh.vertices {
            v.y = -v.y;
        }
        sh.edges.reverse();
        for e in &mut sh.edges {
            *e = match *e {
                EdgeLength::InfiniteLeft => EdgeLength::InfiniteRight,
                EdgeLength::InfiniteRight => EdgeLength::InfiniteLeft,
                other => other,
            };
        }
        if sh.vertices.len() > 1 {
            sh.vertices[1..].reverse();
        }
        if let Some(k) = sh.angles.len().checked_sub(1) {
            sh.angles[..k].reverse();
        }
        sh.connections.reverse();
        if sh.apeirogonal {
            // keep the two ends at infinity in the last two slots
            sh.edges.rotate_left(2);
            sh.vertices.rotate_left(2);
            sh.angles.rotate_left(2);
            sh.connections.rotate_left(2);
        }
    }
    let sizes: Vec<(usize, bool)> = t.shapes.iter().map(|sh| (sh.angles.len(), sh.apeirogonal)).collect();
    for (i, sh) in t.shapes.iter_mut().enumerate() {
        for co in &mut sh.connections {
            let mirr = co.mirror ^ (i >= s);
            co.mirror = false;
            if mirr {
                co.sid += s;
                let (n, apeirogonal) = sizes[co.sid];
                co.eid = n - 1 - co.eid;
                if apeirogonal {
                    co.eid = (co.eid + n - 2) % n;
                }
            }
        }
    }
    info!(mirror_rules = t.mirror_rules, shapes = t.shapes.len(), "took orientable double cover");
}
