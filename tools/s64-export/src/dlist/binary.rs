//! Binary encoding of display-list commands.
//!
//! Each supported command packs into a custom big-endian byte layout, not a
//! uniform record. Arguments arrive in their textual macro-call form and
//! are interpreted here: `G_…` names resolve through the macro tables,
//! `0x…` parses as hex, anything else as permissive decimal — an
//! unrecognized token therefore reads as 0 rather than erroring, matching
//! the layout contract consumers already depend on.

use super::Op;
use crate::material::{atoi, MaterialTable};
use anyhow::{bail, Context, Result};
use s64_common::{resolve_combine_mode, resolve_macro, DlistRecord, GfxCommand};

/// Resolve a macro argument, which may be several names joined with `|`
/// (geometry-mode lists arrive that way).
fn resolve_macro_expr(arg: &str) -> u32 {
    arg.split('|')
        .map(str::trim)
        .map(|part| {
            if part.len() > 2 && part.starts_with("G_") {
                resolve_macro(part)
            } else {
                atoi(part) as u32
            }
        })
        .fold(0, |acc, val| acc | val)
}

/// Full argument interpretation: macro name, hex literal, or decimal.
fn parse_word(arg: &str) -> u32 {
    if arg.len() > 2 && arg.starts_with("G_") {
        resolve_macro_expr(arg)
    } else if arg.len() > 2 && arg.starts_with("0x") {
        let hex = &arg[2..];
        let end = hex
            .find(|c: char| !c.is_ascii_hexdigit())
            .unwrap_or(hex.len());
        u32::from_str_radix(&hex[..end], 16).unwrap_or(0)
    } else {
        atoi(arg) as u32
    }
}

/// Byte-sized field: macro name or decimal.
fn parse_byte(arg: &str) -> u8 {
    if arg.len() > 2 && arg.starts_with("G_") {
        resolve_macro_expr(arg) as u8
    } else {
        atoi(arg) as u8
    }
}

/// Encode one synthesized op, or `None` for the text-only separator.
pub fn encode_op(op: &Op, materials: &MaterialTable) -> Result<Option<DlistRecord>> {
    match op.command() {
        Some(cmd) => encode_command(cmd, &op.args(), materials).map(Some),
        None => Ok(None),
    }
}

/// Encode a command and its textual arguments into a binary record.
pub fn encode_command(
    cmd: GfxCommand,
    args: &[String],
    materials: &MaterialTable,
) -> Result<DlistRecord> {
    if !cmd.binary_supported() {
        bail!("Unsupported Binary DL command {}", cmd.name());
    }
    if args.len() != cmd.arg_count() {
        bail!(
            "{} takes {} arguments, got {}",
            cmd.name(),
            cmd.arg_count(),
            args.len()
        );
    }

    let mut out_cmd = cmd;
    let mut payload = vec![0u8; cmd.binary_word_count() * 4];

    match cmd {
        GfxCommand::DPLoadTextureBlock | GfxCommand::DPLoadTextureBlock4b => {
            // The first argument is the texture's material name; only its
            // index in the global material list is encoded.
            let index = materials
                .find(&args[0])
                .with_context(|| format!("Unknown texture '{}' in display list", args[0]))?;
            payload[0..2].copy_from_slice(&(index as u16).to_be_bytes());
            payload[2] = parse_byte(&args[1]);

            // The 4b variant drops the color-size argument; its byte stays 0.
            let rest = if cmd == GfxCommand::DPLoadTextureBlock {
                payload[3] = parse_byte(&args[2]);
                &args[3..]
            } else {
                &args[2..]
            };

            // rest: w, h, pal, cms, cmt, maskw, maskh, shifts, shiftt
            payload[4..6].copy_from_slice(&(atoi(&rest[0]) as u16).to_be_bytes());
            payload[6..8].copy_from_slice(&(atoi(&rest[1]) as u16).to_be_bytes());
            // The palette argument is constant 0 and is not encoded.
            for (k, arg) in rest[3..9].iter().enumerate() {
                payload[8 + k] = parse_byte(arg);
            }
        }
        GfxCommand::SPVertex => {
            // Pointer expression "<symbol>+<offset>": only the offset lands
            // in the record.
            let offset = match args[0].find('+') {
                Some(plus) => atoi(&args[0][plus + 1..]) as u16,
                None => 0,
            };
            payload[0..2].copy_from_slice(&offset.to_be_bytes());
            payload[2] = atoi(&args[1]) as u8;
            payload[3] = atoi(&args[2]) as u8;
        }
        GfxCommand::SP1Triangle | GfxCommand::SP2Triangles => {
            for (k, arg) in args.iter().enumerate() {
                payload[k] = atoi(arg) as u8;
            }
        }
        GfxCommand::DPSetPrimColor => {
            payload[0..2].copy_from_slice(&(atoi(&args[0]) as i16).to_be_bytes());
            payload[2..4].copy_from_slice(&(atoi(&args[1]) as i16).to_be_bytes());
            for (k, arg) in args[2..].iter().enumerate() {
                payload[4 + k] = atoi(arg) as u8;
            }
        }
        GfxCommand::DPSetCombineMode => {
            out_cmd = GfxCommand::DPSetCombineLERP;
            for (k, arg) in args.iter().enumerate() {
                payload[k * 8..k * 8 + 8].copy_from_slice(&resolve_combine_mode(arg));
            }
        }
        _ => {
            for (k, arg) in args.iter().enumerate() {
                payload[k * 4..k * 4 + 4].copy_from_slice(&parse_word(arg).to_be_bytes());
            }
        }
    }

    Ok(DlistRecord {
        cmd: out_cmd,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::Material;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn table_with(names: &[&str]) -> MaterialTable {
        let mut table = MaterialTable::new();
        for name in names {
            table.insert(Material::requested(name)).unwrap();
        }
        table
    }

    #[test]
    fn vertex_offset_count_layout() {
        let table = MaterialTable::new();
        let rec = encode_command(
            GfxCommand::SPVertex,
            &args(&["vtx_Foo+42", "7", "0"]),
            &table,
        )
        .unwrap();
        assert_eq!(rec.payload, vec![0x00, 0x2A, 0x07, 0x00]);
    }

    #[test]
    fn two_triangles_pack_per_byte() {
        let table = MaterialTable::new();
        let rec = encode_command(
            GfxCommand::SP2Triangles,
            &args(&["1", "2", "3", "0", "4", "5", "6", "0"]),
            &table,
        )
        .unwrap();
        assert_eq!(
            rec.payload,
            vec![0x01, 0x02, 0x03, 0x00, 0x04, 0x05, 0x06, 0x00]
        );
    }

    #[test]
    fn texture_block_layout() {
        let table = table_with(&["Stone"]);
        let rec = encode_command(
            GfxCommand::DPLoadTextureBlock,
            &args(&[
                "Stone",
                "G_IM_FMT_RGBA",
                "G_IM_SIZ_16b",
                "64",
                "32",
                "0",
                "G_TX_MIRROR",
                "G_TX_WRAP",
                "6",
                "5",
                "G_TX_NOLOD",
                "G_TX_NOLOD",
            ]),
            &table,
        )
        .unwrap();
        assert_eq!(rec.cmd, GfxCommand::DPLoadTextureBlock);
        assert_eq!(rec.payload.len(), 16);
        // material index 1 (sentinel sits at 0)
        assert_eq!(&rec.payload[0..2], &[0x00, 0x01]);
        assert_eq!(rec.payload[2], 0); // G_IM_FMT_RGBA
        assert_eq!(rec.payload[3], 2); // G_IM_SIZ_16b
        assert_eq!(&rec.payload[4..6], &[0x00, 0x40]);
        assert_eq!(&rec.payload[6..8], &[0x00, 0x20]);
        assert_eq!(
            &rec.payload[8..14],
            &[1, 0, 6, 5, 0, 0] // mirror, wrap, masks, then NOLOD
        );
    }

    #[test]
    fn texture_block_4b_skips_the_size_byte() {
        let table = table_with(&["Glyphs"]);
        let rec = encode_command(
            GfxCommand::DPLoadTextureBlock4b,
            &args(&[
                "Glyphs",
                "G_IM_FMT_I",
                "16",
                "16",
                "0",
                "G_TX_CLAMP",
                "G_TX_CLAMP",
                "4",
                "4",
                "G_TX_NOLOD",
                "G_TX_NOLOD",
            ]),
            &table,
        )
        .unwrap();
        assert_eq!(rec.payload[2], 4); // G_IM_FMT_I
        assert_eq!(rec.payload[3], 0); // size byte zeroed for 4b
        assert_eq!(&rec.payload[4..6], &[0x00, 0x10]);
        assert_eq!(&rec.payload[8..10], &[2, 2]); // clamp, clamp
    }

    #[test]
    fn prim_color_layout() {
        let table = MaterialTable::new();
        let rec = encode_command(
            GfxCommand::DPSetPrimColor,
            &args(&["0", "0", "200", "30", "40", "255"]),
            &table,
        )
        .unwrap();
        assert_eq!(rec.payload, vec![0, 0, 0, 0, 200, 30, 40, 255]);
    }

    #[test]
    fn combine_mode_rewrites_to_lerp() {
        let table = MaterialTable::new();
        let rec = encode_command(
            GfxCommand::DPSetCombineMode,
            &args(&["G_CC_PRIMLITE", "G_CC_PRIMLITE"]),
            &table,
        )
        .unwrap();
        assert_eq!(rec.cmd, GfxCommand::DPSetCombineLERP);
        assert_eq!(rec.payload.len(), 16);
        assert_eq!(&rec.payload[0..8], &[4, 31, 3, 31, 7, 7, 7, 3]);
        assert_eq!(&rec.payload[0..8], &rec.payload[8..16]);
    }

    #[test]
    fn geometry_mode_ors_joined_flags() {
        let table = MaterialTable::new();
        let rec = encode_command(
            GfxCommand::SPSetGeometryMode,
            &args(&["G_ZBUFFER | G_LIGHTING"]),
            &table,
        )
        .unwrap();
        assert_eq!(rec.payload, 0x0002_0001u32.to_be_bytes().to_vec());
    }

    #[test]
    fn hex_and_unknown_arguments() {
        let table = MaterialTable::new();
        let clear = encode_command(
            GfxCommand::SPClearGeometryMode,
            &args(&["0xFFFFFFFF"]),
            &table,
        )
        .unwrap();
        assert_eq!(clear.payload, vec![0xFF; 4]);

        // an unrecognized word quietly reads as decimal zero
        let junk = encode_command(GfxCommand::DPSetCycleType, &args(&["bogus"]), &table).unwrap();
        assert_eq!(junk.payload, vec![0; 4]);
    }

    #[test]
    fn zero_argument_records_are_bare() {
        let table = MaterialTable::new();
        let sync = encode_command(GfxCommand::DPPipeSync, &[], &table).unwrap();
        assert!(sync.payload.is_empty());
        assert_eq!(sync.to_bytes(), 13u32.to_be_bytes().to_vec());
    }

    #[test]
    fn lerp_is_rejected_as_input() {
        let table = MaterialTable::new();
        let result = encode_command(
            GfxCommand::DPSetCombineLERP,
            &args(&["0"; 16]),
            &table,
        );
        assert!(result.is_err());
    }

    #[test]
    fn records_decode_back() {
        let table = table_with(&["Stone"]);
        let ops = [
            Op::Vertex {
                symbol: "vtx_M".into(),
                offset: 96,
                count: 12,
            },
            Op::Tri1 { v: [3, 4, 5] },
            Op::EndDisplayList,
        ];
        let mut blob = Vec::new();
        for op in &ops {
            blob.extend(encode_op(op, &table).unwrap().unwrap().to_bytes());
        }
        let (first, used) = DlistRecord::parse(&blob).unwrap();
        assert_eq!(first.cmd, GfxCommand::SPVertex);
        assert_eq!(&first.payload, &[0x00, 0x60, 12, 0]);
        let (second, used2) = DlistRecord::parse(&blob[used..]).unwrap();
        assert_eq!(second.cmd, GfxCommand::SP1Triangle);
        assert_eq!(&second.payload, &[3, 4, 5, 0]);
        let (last, _) = DlistRecord::parse(&blob[used + used2..]).unwrap();
        assert_eq!(last.cmd, GfxCommand::SPEndDisplayList);
    }
}
