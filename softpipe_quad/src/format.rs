// Copyright 2025 the Vello Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Packed depth/stencil formats and their bit layouts.

/// How a depth field is encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepthType {
    /// An unsigned normalized integer: `0` is depth `0.0`, all bits set is depth `1.0`.
    Unorm,
    /// An IEEE-754 single precision float.
    Float,
}

/// One field of a packed storage word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Offset of the lowest bit of the field.
    pub shift: u32,
    /// Width of the field in bits.
    pub bits: u32,
}

impl Field {
    /// A mask of `bits` ones, not shifted.
    pub const fn max(self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1 << self.bits) - 1
        }
    }

    /// The mask of the field within the storage word.
    pub const fn mask(self) -> u64 {
        self.max() << self.shift
    }

    /// Extract the field from a storage word, right-justified.
    #[inline]
    pub const fn get(self, word: u64) -> u64 {
        (word >> self.shift) & self.max()
    }

    /// Replace the field in a storage word, keeping all other bits.
    #[inline]
    pub const fn set(self, word: u64, value: u64) -> u64 {
        (word & !self.mask()) | ((value & self.max()) << self.shift)
    }
}

/// The bit layout of a depth/stencil format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDesc {
    /// Width of one storage word in bits.
    pub storage_bits: u32,
    /// The depth field and its encoding, if the format has depth.
    pub depth: Option<(Field, DepthType)>,
    /// The stencil field, if the format has stencil.
    pub stencil: Option<Field>,
}

impl FormatDesc {
    /// Size of one storage word in bytes.
    pub const fn bytes(&self) -> usize {
        (self.storage_bits / 8) as usize
    }

    /// Whether the depth field spans the whole storage word, so no extraction is needed.
    pub fn depth_is_whole_word(&self) -> bool {
        matches!(self.depth, Some((field, _)) if field.shift == 0 && field.bits == self.storage_bits)
    }

    /// Check that all fields fit the storage word and do not overlap.
    pub fn validate(&self) {
        assert!(
            matches!(self.storage_bits, 8 | 16 | 32 | 64),
            "unsupported storage width of {} bits",
            self.storage_bits
        );
        let fits = |field: &Field| field.bits > 0 && field.shift + field.bits <= self.storage_bits;
        if let Some((depth, ty)) = &self.depth {
            assert!(fits(depth), "depth field {depth:?} does not fit the storage word");
            assert!(
                *ty == DepthType::Unorm || depth.bits == 32,
                "float depth must be 32 bits wide"
            );
        }
        if let Some(stencil) = &self.stencil {
            assert!(fits(stencil), "stencil field {stencil:?} does not fit the storage word");
            assert!(stencil.bits <= 8, "stencil fields wider than 8 bits are not supported");
        }
        if let (Some((depth, _)), Some(stencil)) = (&self.depth, &self.stencil) {
            assert_eq!(
                depth.mask() & stencil.mask(),
                0,
                "depth and stencil fields overlap"
            );
        }
    }

    /// Split a storage word into its raw depth and stencil fields.
    ///
    /// Missing fields read as zero.
    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "depth fields are at most 32 and stencil fields at most 8 bits wide"
    )]
    pub fn unpack(&self, word: u64) -> (u32, u8) {
        let depth = match self.depth {
            _ if self.depth_is_whole_word() => word,
            Some((field, _)) => field.get(word),
            None => 0,
        };
        let stencil = self.stencil.map_or(0, |field| field.get(word));

        (depth as u32, stencil as u8)
    }

    /// Convert a window depth in `[0, 1]` to the raw depth field.
    ///
    /// Normalized formats use `trunc(clamp(z, 0, 1) * (2^bits - 1))`, float formats store the
    /// clamped value.
    #[inline]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "the product is at most the field maximum, which fits 32 bits"
    )]
    pub fn encode_depth(&self, z: f32) -> u32 {
        let z = z.clamp(0.0, 1.0);
        match self.depth {
            Some((field, DepthType::Unorm)) => (f64::from(z) * field.max() as f64) as u32,
            Some((_, DepthType::Float)) => z.to_bits(),
            None => 0,
        }
    }

    /// Convert a raw depth field back to a window depth.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "depth is only stored with 32 bits of precision"
    )]
    pub fn decode_depth(&self, raw: u32) -> f32 {
        match self.depth {
            Some((field, DepthType::Unorm)) => (f64::from(raw) / field.max() as f64) as f32,
            Some((_, DepthType::Float)) => f32::from_bits(raw),
            None => 0.0,
        }
    }

    /// The largest stencil value, or zero if the format has no stencil.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "stencil fields are at most 8 bits wide"
    )]
    pub fn stencil_max(&self) -> u8 {
        self.stencil.map_or(0, |field| field.max() as u8)
    }

    /// Store raw depth and stencil fields into `word`, keeping padding bits.
    #[inline]
    pub fn pack(&self, word: u64, depth: u32, stencil: u8) -> u64 {
        let mut word = word;
        if let Some((field, _)) = self.depth {
            word = field.set(word, u64::from(depth));
        }
        if let Some(field) = self.stencil {
            word = field.set(word, u64::from(stencil));
        }
        word
    }
}

/// The depth/stencil formats a [`DepthStencilSurface`](crate::surface::DepthStencilSurface)
/// can hold.
///
/// Channel names are listed from the least significant bit up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DepthStencilFormat {
    /// 16-bit normalized depth.
    Z16Unorm,
    /// 32-bit normalized depth.
    Z32Unorm,
    /// 32-bit float depth.
    Z32Float,
    /// 24-bit normalized depth in the low bits, 8-bit stencil in the high bits.
    Z24UnormS8Uint,
    /// 8-bit stencil in the low bits, 24-bit normalized depth in the high bits.
    S8UintZ24Unorm,
    /// 24-bit normalized depth in the low bits, 8 padding bits.
    Z24X8Unorm,
    /// 8 padding bits, 24-bit normalized depth in the high bits.
    X8Z24Unorm,
    /// 8-bit stencil only.
    S8Uint,
    /// 32-bit float depth, 8-bit stencil and 24 padding bits.
    Z32FloatS8X24Uint,
}

impl DepthStencilFormat {
    /// The bit layout of the format.
    pub const fn description(self) -> FormatDesc {
        const fn field(shift: u32, bits: u32) -> Field {
            Field { shift, bits }
        }

        let (storage_bits, depth, stencil) = match self {
            Self::Z16Unorm => (16, Some((field(0, 16), DepthType::Unorm)), None),
            Self::Z32Unorm => (32, Some((field(0, 32), DepthType::Unorm)), None),
            Self::Z32Float => (32, Some((field(0, 32), DepthType::Float)), None),
            Self::Z24UnormS8Uint => (
                32,
                Some((field(0, 24), DepthType::Unorm)),
                Some(field(24, 8)),
            ),
            Self::S8UintZ24Unorm => (
                32,
                Some((field(8, 24), DepthType::Unorm)),
                Some(field(0, 8)),
            ),
            Self::Z24X8Unorm => (32, Some((field(0, 24), DepthType::Unorm)), None),
            Self::X8Z24Unorm => (32, Some((field(8, 24), DepthType::Unorm)), None),
            Self::S8Uint => (8, None, Some(field(0, 8))),
            Self::Z32FloatS8X24Uint => (
                64,
                Some((field(0, 32), DepthType::Float)),
                Some(field(32, 8)),
            ),
        };

        FormatDesc {
            storage_bits,
            depth,
            stencil,
        }
    }

    /// Whether the format has a depth field.
    pub const fn has_depth(self) -> bool {
        self.description().depth.is_some()
    }

    /// Whether the format has a stencil field.
    pub const fn has_stencil(self) -> bool {
        self.description().stencil.is_some()
    }
}
