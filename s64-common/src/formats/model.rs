//! Sausage64 binary model container (.bin)
//!
//! All multi-byte fields are big-endian, matching the target console.
//!
//! # Layout
//! ```text
//! 0x00: magic u16 (0x5364)
//! 0x02: mesh_count u16
//! 0x04: anim_count u16
//! 0x06: offset_meshes u32 (mesh TOC)
//! 0x0A: offset_anims u32 (animation section, 0 if none)
//! then: mesh TOC entries (28 bytes each)
//! then: per mesh, its data record, vertex records, display-list blob
//! then: animation records
//! ```

use crate::gbi::GfxCommand;

/// Container file header (14 bytes).
#[derive(Debug, Clone, Copy)]
pub struct ModelHeader {
    pub mesh_count: u16,
    pub anim_count: u16,
    pub offset_meshes: u32,
    pub offset_anims: u32,
}

impl ModelHeader {
    pub const SIZE: usize = 14;
    pub const MAGIC: u16 = 0x5364;

    pub fn new(mesh_count: u16, anim_count: u16) -> Self {
        Self {
            mesh_count,
            anim_count,
            offset_meshes: 0,
            offset_anims: 0,
        }
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        bytes[0..2].copy_from_slice(&Self::MAGIC.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.mesh_count.to_be_bytes());
        bytes[4..6].copy_from_slice(&self.anim_count.to_be_bytes());
        bytes[6..10].copy_from_slice(&self.offset_meshes.to_be_bytes());
        bytes[10..14].copy_from_slice(&self.offset_anims.to_be_bytes());
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        if u16::from_be_bytes([bytes[0], bytes[1]]) != Self::MAGIC {
            return None;
        }
        Some(Self {
            mesh_count: u16::from_be_bytes([bytes[2], bytes[3]]),
            anim_count: u16::from_be_bytes([bytes[4], bytes[5]]),
            offset_meshes: u32::from_be_bytes([bytes[6], bytes[7], bytes[8], bytes[9]]),
            offset_anims: u32::from_be_bytes([bytes[10], bytes[11], bytes[12], bytes[13]]),
        })
    }
}

/// Per-mesh table-of-contents entry (28 bytes).
#[derive(Debug, Clone, Copy, Default)]
pub struct MeshTocEntry {
    pub meshdata_offset: u32,
    pub meshdata_size: u32,
    pub vertdata_offset: u32,
    pub vertdata_size: u32,
    pub dldata_offset: u32,
    pub dldata_size: u32,
    pub dldata_slots: u32,
}

impl MeshTocEntry {
    pub const SIZE: usize = 28;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let fields = [
            self.meshdata_offset,
            self.meshdata_size,
            self.vertdata_offset,
            self.vertdata_size,
            self.dldata_offset,
            self.dldata_size,
            self.dldata_slots,
        ];
        for (i, f) in fields.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&f.to_be_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let word = |i: usize| {
            u32::from_be_bytes([bytes[i * 4], bytes[i * 4 + 1], bytes[i * 4 + 2], bytes[i * 4 + 3]])
        };
        Some(Self {
            meshdata_offset: word(0),
            meshdata_size: word(1),
            vertdata_offset: word(2),
            vertdata_size: word(3),
            dldata_offset: word(4),
            dldata_size: word(5),
            dldata_slots: word(6),
        })
    }
}

/// Mesh metadata record: parent index (-1 when none), billboard flag, and
/// the NUL-terminated mesh name.
#[derive(Debug, Clone)]
pub struct MeshDataRecord {
    pub parent: i16,
    pub is_billboard: bool,
    pub name: String,
}

impl MeshDataRecord {
    pub fn size(&self) -> usize {
        2 + 1 + self.name.len() + 1
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.extend_from_slice(&self.parent.to_be_bytes());
        bytes.push(self.is_billboard as u8);
        bytes.extend_from_slice(self.name.as_bytes());
        bytes.push(0);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }
        let nul = bytes[3..].iter().position(|&b| b == 0)?;
        Some(Self {
            parent: i16::from_be_bytes([bytes[0], bytes[1]]),
            is_billboard: bytes[2] != 0,
            name: String::from_utf8_lossy(&bytes[3..3 + nul]).into_owned(),
        })
    }
}

/// Hardware-ready vertex record: integer position, s10.5 texture
/// coordinates, and a color-or-normal byte quad.
#[derive(Debug, Clone, Copy)]
pub struct UltraVert {
    pub pos: [i16; 3],
    pub tex: [i16; 2],
    pub color_normal: [u8; 4],
}

impl UltraVert {
    pub const SIZE: usize = 16;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        for (i, p) in self.pos.iter().enumerate() {
            bytes[i * 2..i * 2 + 2].copy_from_slice(&p.to_be_bytes());
        }
        // bytes 6..8 are padding
        for (i, t) in self.tex.iter().enumerate() {
            bytes[8 + i * 2..10 + i * 2].copy_from_slice(&t.to_be_bytes());
        }
        bytes[12..16].copy_from_slice(&self.color_normal);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::SIZE {
            return None;
        }
        let s16 = |i: usize| i16::from_be_bytes([bytes[i], bytes[i + 1]]);
        Some(Self {
            pos: [s16(0), s16(2), s16(4)],
            tex: [s16(8), s16(10)],
            color_normal: [bytes[12], bytes[13], bytes[14], bytes[15]],
        })
    }
}

/// Float vertex record for the OpenGL flavor.
#[derive(Debug, Clone, Copy)]
pub struct GlVert {
    pub pos: [f32; 3],
    pub tex: [f32; 2],
    pub normal: [f32; 3],
    pub color: [f32; 3],
}

impl GlVert {
    pub const SIZE: usize = 44;

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut bytes = [0u8; Self::SIZE];
        let fields = [
            self.pos[0], self.pos[1], self.pos[2],
            self.tex[0], self.tex[1],
            self.normal[0], self.normal[1], self.normal[2],
            self.color[0], self.color[1], self.color[2],
        ];
        for (i, f) in fields.iter().enumerate() {
            bytes[i * 4..i * 4 + 4].copy_from_slice(&f.to_bits().to_be_bytes());
        }
        bytes
    }
}

/// One encoded display-list command: the command id word plus its packed
/// payload words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DlistRecord {
    pub cmd: GfxCommand,
    pub payload: Vec<u8>,
}

impl DlistRecord {
    pub fn size(&self) -> usize {
        4 + self.payload.len()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.size());
        bytes.extend_from_slice(&(self.cmd as u32).to_be_bytes());
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse one record off the front of `bytes`, returning it and the
    /// number of bytes consumed.
    pub fn parse(bytes: &[u8]) -> Option<(Self, usize)> {
        if bytes.len() < 4 {
            return None;
        }
        let cmd = GfxCommand::from_id(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))?;
        let len = cmd.binary_word_count() * 4;
        if bytes.len() < 4 + len {
            return None;
        }
        Some((
            Self {
                cmd,
                payload: bytes[4..4 + len].to_vec(),
            },
            4 + len,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_roundtrip() {
        let mut header = ModelHeader::new(3, 2);
        header.offset_meshes = 14;
        header.offset_anims = 0x1234;
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), ModelHeader::SIZE);
        assert_eq!(&bytes[0..2], &[0x53, 0x64]);

        let parsed = ModelHeader::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.mesh_count, 3);
        assert_eq!(parsed.anim_count, 2);
        assert_eq!(parsed.offset_meshes, 14);
        assert_eq!(parsed.offset_anims, 0x1234);
    }

    #[test]
    fn header_rejects_bad_magic() {
        let mut bytes = ModelHeader::new(1, 0).to_bytes();
        bytes[0] = 0xFF;
        assert!(ModelHeader::from_bytes(&bytes).is_none());
    }

    #[test]
    fn toc_roundtrip() {
        let entry = MeshTocEntry {
            meshdata_offset: 100,
            meshdata_size: 8,
            vertdata_offset: 108,
            vertdata_size: 48,
            dldata_offset: 156,
            dldata_size: 64,
            dldata_slots: 5,
        };
        let parsed = MeshTocEntry::from_bytes(&entry.to_bytes()).unwrap();
        assert_eq!(parsed.dldata_offset, 156);
        assert_eq!(parsed.dldata_slots, 5);
    }

    #[test]
    fn meshdata_roundtrip() {
        let rec = MeshDataRecord {
            parent: -1,
            is_billboard: true,
            name: "Torso".into(),
        };
        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), rec.size());
        assert_eq!(*bytes.last().unwrap(), 0);

        let parsed = MeshDataRecord::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.parent, -1);
        assert!(parsed.is_billboard);
        assert_eq!(parsed.name, "Torso");
    }

    #[test]
    fn ultravert_layout() {
        let vert = UltraVert {
            pos: [1, -2, 300],
            tex: [64, -32],
            color_normal: [10, 20, 30, 255],
        };
        let bytes = vert.to_bytes();
        assert_eq!(bytes[0..2], [0x00, 0x01]);
        assert_eq!(bytes[2..4], [0xFF, 0xFE]);
        // padding word stays zero
        assert_eq!(bytes[6..8], [0, 0]);
        assert_eq!(bytes[8..10], [0x00, 0x40]);
        let parsed = UltraVert::from_bytes(&bytes).unwrap();
        assert_eq!(parsed.pos, vert.pos);
        assert_eq!(parsed.tex, vert.tex);
        assert_eq!(parsed.color_normal, vert.color_normal);
    }

    #[test]
    fn dlist_record_parse() {
        let rec = DlistRecord {
            cmd: GfxCommand::SP1Triangle,
            payload: vec![0, 1, 2, 0],
        };
        let bytes = rec.to_bytes();
        assert_eq!(bytes.len(), 8);
        let (parsed, used) = DlistRecord::parse(&bytes).unwrap();
        assert_eq!(used, 8);
        assert_eq!(parsed, rec);
    }
}
