//! Text serialization of display-list commands.
//!
//! Arguments pass through verbatim in their supplied textual form; no
//! interpretation happens here.

use super::Op;

/// Render one op as a C macro-call line, or a blank line for the
/// inter-cache separator.
pub fn format_op(op: &Op) -> String {
    match op.command() {
        Some(cmd) => format!("    gs{}({}),\n", cmd.name(), op.args().join(", ")),
        None => "\n".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_macro_calls() {
        let op = Op::Vertex {
            symbol: "vtx_Model".into(),
            offset: 32,
            count: 9,
        };
        assert_eq!(format_op(&op), "    gsSPVertex(vtx_Model+32, 9, 0),\n");

        assert_eq!(format_op(&Op::PipeSync), "    gsDPPipeSync(),\n");
        assert_eq!(
            format_op(&Op::Tri2 {
                a: [0, 1, 2],
                b: [0, 2, 3]
            }),
            "    gsSP2Triangles(0, 1, 2, 0, 0, 2, 3, 0),\n"
        );
        assert_eq!(
            format_op(&Op::SetGeometryMode {
                flags: vec!["G_ZBUFFER".into(), "G_LIGHTING".into()]
            }),
            "    gsSPSetGeometryMode(G_ZBUFFER | G_LIGHTING),\n"
        );
    }

    #[test]
    fn separator_is_a_blank_line() {
        assert_eq!(format_op(&Op::Separator), "\n");
    }
}
