//! Pixel format catalog.
//!
//! Maps the four-character format codes used by video allocators to a closed
//! set of named formats, and describes the plane geometry of each format.
//! Unknown codes map to [`PixelFormat::Unknown`] instead of failing.

use crate::error::{BufferError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Pack a four-character code into its big-endian `u32` value.
pub const fn fourcc(code: &[u8; 4]) -> u32 {
    u32::from_be_bytes(*code)
}

/// Named pixel formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PixelFormat {
    Monochrome1,
    Indexed2,
    Indexed4,
    Indexed8,
    IndexedGray1WhiteIsZero,
    IndexedGray2WhiteIsZero,
    IndexedGray4WhiteIsZero,
    IndexedGray8WhiteIsZero,
    Rgb555Be16,
    Rgb555Le16,
    Rgb5551Le16,
    Rgb565Be16,
    Rgb565Le16,
    Rgb24,
    Bgr24,
    Argb32,
    Bgra32,
    Abgr32,
    Rgba32,
    Argb64,
    Rgba64Le,
    Rgb48,
    AlphaGray32,
    Gray16,
    Rgb30,
    YpCbCr422_8,
    YpCbCrA4444_8,
    YpCbCrA4444_8R,
    AYpCbCr4444_8,
    AYpCbCr4444_16,
    YpCbCr444_8,
    YpCbCr422_16,
    YpCbCr422_10,
    YpCbCr444_10,
    YpCbCr420_8Planar,
    YpCbCr420_8PlanarFullRange,
    YpCbCr422_4A8BiPlanar,
    YpCbCr420_8BiPlanarVideoRange,
    YpCbCr420_8BiPlanarFullRange,
    YpCbCr422_8BiPlanarVideoRange,
    YpCbCr422_8BiPlanarFullRange,
    YpCbCr444_8BiPlanarVideoRange,
    YpCbCr444_8BiPlanarFullRange,
    YpCbCr422_8Yuvs,
    YpCbCr422_8FullRange,
    OneComponent8,
    TwoComponent8,
    Rgb30LePackedWideGamut,
    Argb2101010LePacked,
    Argb40LeWideGamut,
    Argb40LeWideGamutPremultiplied,
    OneComponent10,
    OneComponent12,
    OneComponent16,
    TwoComponent16,
    OneComponent16Half,
    OneComponent32Float,
    TwoComponent16Half,
    TwoComponent32Float,
    RgbaHalf64,
    RgbaFloat128,
    Bayer14Grbg,
    Bayer14Rggb,
    Bayer14Bggr,
    Bayer14Gbrg,
    DisparityFloat16,
    DisparityFloat32,
    DepthFloat16,
    DepthFloat32,
    YpCbCr420_10BiPlanarVideoRange,
    YpCbCr422_10BiPlanarVideoRange,
    YpCbCr444_10BiPlanarVideoRange,
    YpCbCr420_10BiPlanarFullRange,
    YpCbCr422_10BiPlanarFullRange,
    YpCbCr444_10BiPlanarFullRange,
    YpCbCr420_8VideoRange8ATriPlanar,
    VersatileBayer16,
    RgbaDownscaledProResRaw64,
    YpCbCr422_16BiPlanarVideoRange,
    YpCbCr444_16BiPlanarVideoRange,
    YpCbCr444_16VideoRange16ATriPlanar,
    LosslessBgra32,
    LosslessYpCbCr420_8BiPlanarVideoRange,
    LosslessYpCbCr420_8BiPlanarFullRange,
    LosslessYpCbCr420_10PackedBiPlanarVideoRange,
    LosslessYpCbCr422_10PackedBiPlanarVideoRange,
    LossyBgra32,
    LossyYpCbCr420_8BiPlanarVideoRange,
    LossyYpCbCr420_8BiPlanarFullRange,
    LossyYpCbCr420_10PackedBiPlanarVideoRange,
    LossyYpCbCr422_10PackedBiPlanarVideoRange,
    /// Sentinel for codes missing from the catalog.
    Unknown,
}

/// Storage layout of one plane relative to the buffer's pixel dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaneLayout {
    /// Horizontal subsampling divisor (2 for 4:2:x chroma).
    pub horizontal_subsampling: u8,
    /// Vertical subsampling divisor (2 for 4:2:0 chroma).
    pub vertical_subsampling: u8,
    /// Number of horizontally adjacent elements stored in one block.
    pub block_width: u8,
    /// Bytes occupied by one block.
    pub block_bytes: u8,
}

impl PlaneLayout {
    const fn new(
        horizontal_subsampling: u8,
        vertical_subsampling: u8,
        block_width: u8,
        block_bytes: u8,
    ) -> Self {
        Self {
            horizontal_subsampling,
            vertical_subsampling,
            block_width,
            block_bytes,
        }
    }

    /// Plane dimensions in elements for a buffer of the given pixel size.
    pub fn plane_size(&self, width: usize, height: usize) -> (usize, usize) {
        (
            width.div_ceil(self.horizontal_subsampling as usize),
            height.div_ceil(self.vertical_subsampling as usize),
        )
    }

    /// Smallest legal bytes-per-row for a plane `plane_width` elements wide,
    /// or `None` if it does not fit in `usize`.
    pub fn min_bytes_per_row(&self, plane_width: usize) -> Option<usize> {
        plane_width
            .div_ceil(self.block_width as usize)
            .checked_mul(self.block_bytes as usize)
    }
}

/// Derived description of a format, as consumed by allocators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatDescription {
    pub format: PixelFormat,
    pub is_planar: bool,
    /// Number of planes as reported by buffers: 0 for chunky formats.
    pub plane_count: usize,
    /// Layout of each stored plane; chunky formats carry exactly one entry.
    pub planes: &'static [PlaneLayout],
}

struct FormatEntry {
    format: PixelFormat,
    code: u32,
    name: &'static str,
    /// `None` for compressed formats, which have no CPU-addressable layout.
    layout: Option<&'static [PlaneLayout]>,
}

const fn packed(block_width: u8, block_bytes: u8) -> [PlaneLayout; 1] {
    [PlaneLayout::new(1, 1, block_width, block_bytes)]
}

const BITS_1: &[PlaneLayout] = &packed(8, 1);
const BITS_2: &[PlaneLayout] = &packed(4, 1);
const BITS_4: &[PlaneLayout] = &packed(2, 1);
const BYTES_1: &[PlaneLayout] = &packed(1, 1);
const BYTES_2: &[PlaneLayout] = &packed(1, 2);
const BYTES_3: &[PlaneLayout] = &packed(1, 3);
const BYTES_4: &[PlaneLayout] = &packed(1, 4);
const BYTES_6: &[PlaneLayout] = &packed(1, 6);
const BYTES_8: &[PlaneLayout] = &packed(1, 8);
const BYTES_16: &[PlaneLayout] = &packed(1, 16);
const PAIR_4: &[PlaneLayout] = &packed(2, 4);
const PAIR_8: &[PlaneLayout] = &packed(2, 8);
const V210: &[PlaneLayout] = &packed(6, 16);

const LUMA_8: PlaneLayout = PlaneLayout::new(1, 1, 1, 1);
const LUMA_16: PlaneLayout = PlaneLayout::new(1, 1, 1, 2);

const PLANAR_420_8: &[PlaneLayout] = &[
    LUMA_8,
    PlaneLayout::new(2, 2, 1, 1),
    PlaneLayout::new(2, 2, 1, 1),
];
const BIPLANAR_420_8: &[PlaneLayout] = &[LUMA_8, PlaneLayout::new(2, 2, 1, 2)];
const BIPLANAR_422_8: &[PlaneLayout] = &[LUMA_8, PlaneLayout::new(2, 1, 1, 2)];
const BIPLANAR_444_8: &[PlaneLayout] = &[LUMA_8, PlaneLayout::new(1, 1, 1, 2)];
const BIPLANAR_420_16: &[PlaneLayout] = &[LUMA_16, PlaneLayout::new(2, 2, 1, 4)];
const BIPLANAR_422_16: &[PlaneLayout] = &[LUMA_16, PlaneLayout::new(2, 1, 1, 4)];
const BIPLANAR_444_16: &[PlaneLayout] = &[LUMA_16, PlaneLayout::new(1, 1, 1, 4)];
const BIPLANAR_422_ALPHA_8: &[PlaneLayout] = &[PlaneLayout::new(1, 1, 2, 4), LUMA_8];
const TRIPLANAR_420_ALPHA_8: &[PlaneLayout] = &[LUMA_8, PlaneLayout::new(2, 2, 1, 2), LUMA_8];
const TRIPLANAR_444_ALPHA_16: &[PlaneLayout] = &[LUMA_16, PlaneLayout::new(1, 1, 1, 4), LUMA_16];

macro_rules! entry {
    ($format:ident, $code:expr, $name:literal, $layout:expr) => {
        FormatEntry {
            format: PixelFormat::$format,
            code: $code,
            name: $name,
            layout: $layout,
        }
    };
}

#[rustfmt::skip]
static CATALOG: &[FormatEntry] = &[
    entry!(Monochrome1, 0x0000_0001, "1Monochrome", Some(BITS_1)),
    entry!(Indexed2, 0x0000_0002, "2Indexed", Some(BITS_2)),
    entry!(Indexed4, 0x0000_0004, "4Indexed", Some(BITS_4)),
    entry!(Indexed8, 0x0000_0008, "8Indexed", Some(BYTES_1)),
    entry!(IndexedGray1WhiteIsZero, 0x0000_0021, "1IndexedGray_WhiteIsZero", Some(BITS_1)),
    entry!(IndexedGray2WhiteIsZero, 0x0000_0022, "2IndexedGray_WhiteIsZero", Some(BITS_2)),
    entry!(IndexedGray4WhiteIsZero, 0x0000_0024, "4IndexedGray_WhiteIsZero", Some(BITS_4)),
    entry!(IndexedGray8WhiteIsZero, 0x0000_0028, "8IndexedGray_WhiteIsZero", Some(BYTES_1)),
    entry!(Rgb555Be16, 0x0000_0010, "16BE555", Some(BYTES_2)),
    entry!(Rgb555Le16, fourcc(b"L555"), "16LE555", Some(BYTES_2)),
    entry!(Rgb5551Le16, fourcc(b"5551"), "16LE5551", Some(BYTES_2)),
    entry!(Rgb565Be16, fourcc(b"B565"), "16BE565", Some(BYTES_2)),
    entry!(Rgb565Le16, fourcc(b"L565"), "16LE565", Some(BYTES_2)),
    entry!(Rgb24, 0x0000_0018, "24RGB", Some(BYTES_3)),
    entry!(Bgr24, fourcc(b"24BG"), "24BGR", Some(BYTES_3)),
    entry!(Argb32, 0x0000_0020, "32ARGB", Some(BYTES_4)),
    entry!(Bgra32, fourcc(b"BGRA"), "32BGRA", Some(BYTES_4)),
    entry!(Abgr32, fourcc(b"ABGR"), "32ABGR", Some(BYTES_4)),
    entry!(Rgba32, fourcc(b"RGBA"), "32RGBA", Some(BYTES_4)),
    entry!(Argb64, fourcc(b"b64a"), "64ARGB", Some(BYTES_8)),
    entry!(Rgba64Le, fourcc(b"l64r"), "64RGBALE", Some(BYTES_8)),
    entry!(Rgb48, fourcc(b"b48r"), "48RGB", Some(BYTES_6)),
    entry!(AlphaGray32, fourcc(b"b32a"), "32AlphaGray", Some(BYTES_4)),
    entry!(Gray16, fourcc(b"b16g"), "16Gray", Some(BYTES_2)),
    entry!(Rgb30, fourcc(b"R10k"), "30RGB", Some(BYTES_4)),
    entry!(YpCbCr422_8, fourcc(b"2vuy"), "422YpCbCr8", Some(PAIR_4)),
    entry!(YpCbCrA4444_8, fourcc(b"v408"), "4444YpCbCrA8", Some(BYTES_4)),
    entry!(YpCbCrA4444_8R, fourcc(b"r408"), "4444YpCbCrA8R", Some(BYTES_4)),
    entry!(AYpCbCr4444_8, fourcc(b"y408"), "4444AYpCbCr8", Some(BYTES_4)),
    entry!(AYpCbCr4444_16, fourcc(b"y416"), "4444AYpCbCr16", Some(BYTES_8)),
    entry!(YpCbCr444_8, fourcc(b"v308"), "444YpCbCr8", Some(BYTES_3)),
    entry!(YpCbCr422_16, fourcc(b"v216"), "422YpCbCr16", Some(PAIR_8)),
    entry!(YpCbCr422_10, fourcc(b"v210"), "422YpCbCr10", Some(V210)),
    entry!(YpCbCr444_10, fourcc(b"v410"), "444YpCbCr10", Some(BYTES_4)),
    entry!(YpCbCr420_8Planar, fourcc(b"y420"), "420YpCbCr8Planar", Some(PLANAR_420_8)),
    entry!(YpCbCr420_8PlanarFullRange, fourcc(b"f420"), "420YpCbCr8PlanarFullRange", Some(PLANAR_420_8)),
    entry!(YpCbCr422_4A8BiPlanar, fourcc(b"a2vy"), "422YpCbCr_4A_8BiPlanar", Some(BIPLANAR_422_ALPHA_8)),
    entry!(YpCbCr420_8BiPlanarVideoRange, fourcc(b"420v"), "420YpCbCr8BiPlanarVideoRange", Some(BIPLANAR_420_8)),
    entry!(YpCbCr420_8BiPlanarFullRange, fourcc(b"420f"), "420YpCbCr8BiPlanarFullRange", Some(BIPLANAR_420_8)),
    entry!(YpCbCr422_8BiPlanarVideoRange, fourcc(b"422v"), "422YpCbCr8BiPlanarVideoRange", Some(BIPLANAR_422_8)),
    entry!(YpCbCr422_8BiPlanarFullRange, fourcc(b"422f"), "422YpCbCr8BiPlanarFullRange", Some(BIPLANAR_422_8)),
    entry!(YpCbCr444_8BiPlanarVideoRange, fourcc(b"444v"), "444YpCbCr8BiPlanarVideoRange", Some(BIPLANAR_444_8)),
    entry!(YpCbCr444_8BiPlanarFullRange, fourcc(b"444f"), "444YpCbCr8BiPlanarFullRange", Some(BIPLANAR_444_8)),
    entry!(YpCbCr422_8Yuvs, fourcc(b"yuvs"), "422YpCbCr8_yuvs", Some(PAIR_4)),
    entry!(YpCbCr422_8FullRange, fourcc(b"yuvf"), "422YpCbCr8FullRange", Some(PAIR_4)),
    entry!(OneComponent8, fourcc(b"L008"), "OneComponent8", Some(BYTES_1)),
    entry!(TwoComponent8, fourcc(b"2C08"), "TwoComponent8", Some(BYTES_2)),
    entry!(Rgb30LePackedWideGamut, fourcc(b"w30r"), "30RGBLEPackedWideGamut", Some(BYTES_4)),
    entry!(Argb2101010LePacked, fourcc(b"l10r"), "ARGB2101010LEPacked", Some(BYTES_4)),
    entry!(Argb40LeWideGamut, fourcc(b"w40a"), "40ARGBLEWideGamut", Some(BYTES_8)),
    entry!(Argb40LeWideGamutPremultiplied, fourcc(b"w40m"), "40ARGBLEWideGamutPremultiplied", Some(BYTES_8)),
    entry!(OneComponent10, fourcc(b"L010"), "OneComponent10", Some(BYTES_2)),
    entry!(OneComponent12, fourcc(b"L012"), "OneComponent12", Some(BYTES_2)),
    entry!(OneComponent16, fourcc(b"L016"), "OneComponent16", Some(BYTES_2)),
    entry!(TwoComponent16, fourcc(b"2C16"), "TwoComponent16", Some(BYTES_4)),
    entry!(OneComponent16Half, fourcc(b"L00h"), "OneComponent16Half", Some(BYTES_2)),
    entry!(OneComponent32Float, fourcc(b"L00f"), "OneComponent32Float", Some(BYTES_4)),
    entry!(TwoComponent16Half, fourcc(b"2C0h"), "TwoComponent16Half", Some(BYTES_4)),
    entry!(TwoComponent32Float, fourcc(b"2C0f"), "TwoComponent32Float", Some(BYTES_8)),
    entry!(RgbaHalf64, fourcc(b"RGhA"), "64RGBAHalf", Some(BYTES_8)),
    entry!(RgbaFloat128, fourcc(b"RGfA"), "128RGBAFloat", Some(BYTES_16)),
    entry!(Bayer14Grbg, fourcc(b"grb4"), "14Bayer_GRBG", Some(BYTES_2)),
    entry!(Bayer14Rggb, fourcc(b"rgg4"), "14Bayer_RGGB", Some(BYTES_2)),
    entry!(Bayer14Bggr, fourcc(b"bgg4"), "14Bayer_BGGR", Some(BYTES_2)),
    entry!(Bayer14Gbrg, fourcc(b"gbr4"), "14Bayer_GBRG", Some(BYTES_2)),
    entry!(DisparityFloat16, fourcc(b"hdis"), "DisparityFloat16", Some(BYTES_2)),
    entry!(DisparityFloat32, fourcc(b"fdis"), "DisparityFloat32", Some(BYTES_4)),
    entry!(DepthFloat16, fourcc(b"hdep"), "DepthFloat16", Some(BYTES_2)),
    entry!(DepthFloat32, fourcc(b"fdep"), "DepthFloat32", Some(BYTES_4)),
    entry!(YpCbCr420_10BiPlanarVideoRange, fourcc(b"x420"), "420YpCbCr10BiPlanarVideoRange", Some(BIPLANAR_420_16)),
    entry!(YpCbCr422_10BiPlanarVideoRange, fourcc(b"x422"), "422YpCbCr10BiPlanarVideoRange", Some(BIPLANAR_422_16)),
    entry!(YpCbCr444_10BiPlanarVideoRange, fourcc(b"x444"), "444YpCbCr10BiPlanarVideoRange", Some(BIPLANAR_444_16)),
    entry!(YpCbCr420_10BiPlanarFullRange, fourcc(b"xf20"), "420YpCbCr10BiPlanarFullRange", Some(BIPLANAR_420_16)),
    entry!(YpCbCr422_10BiPlanarFullRange, fourcc(b"xf22"), "422YpCbCr10BiPlanarFullRange", Some(BIPLANAR_422_16)),
    entry!(YpCbCr444_10BiPlanarFullRange, fourcc(b"xf44"), "444YpCbCr10BiPlanarFullRange", Some(BIPLANAR_444_16)),
    entry!(YpCbCr420_8VideoRange8ATriPlanar, fourcc(b"v0a8"), "420YpCbCr8VideoRange_8A_TriPlanar", Some(TRIPLANAR_420_ALPHA_8)),
    entry!(VersatileBayer16, fourcc(b"bp16"), "16VersatileBayer", Some(BYTES_2)),
    entry!(RgbaDownscaledProResRaw64, fourcc(b"bp64"), "64RGBA_DownscaledProResRAW", Some(BYTES_8)),
    entry!(YpCbCr422_16BiPlanarVideoRange, fourcc(b"sv22"), "422YpCbCr16BiPlanarVideoRange", Some(BIPLANAR_422_16)),
    entry!(YpCbCr444_16BiPlanarVideoRange, fourcc(b"sv44"), "444YpCbCr16BiPlanarVideoRange", Some(BIPLANAR_444_16)),
    entry!(YpCbCr444_16VideoRange16ATriPlanar, fourcc(b"s4as"), "444YpCbCr16VideoRange_16A_TriPlanar", Some(TRIPLANAR_444_ALPHA_16)),
    entry!(LosslessBgra32, fourcc(b"&BGA"), "Lossless_32BGRA", None),
    entry!(LosslessYpCbCr420_8BiPlanarVideoRange, fourcc(b"&8v0"), "Lossless_420YpCbCr8BiPlanarVideoRange", None),
    entry!(LosslessYpCbCr420_8BiPlanarFullRange, fourcc(b"&8f0"), "Lossless_420YpCbCr8BiPlanarFullRange", None),
    entry!(LosslessYpCbCr420_10PackedBiPlanarVideoRange, fourcc(b"&xv0"), "Lossless_420YpCbCr10PackedBiPlanarVideoRange", None),
    entry!(LosslessYpCbCr422_10PackedBiPlanarVideoRange, fourcc(b"&xv2"), "Lossless_422YpCbCr10PackedBiPlanarVideoRange", None),
    entry!(LossyBgra32, fourcc(b"-BGA"), "Lossy_32BGRA", None),
    entry!(LossyYpCbCr420_8BiPlanarVideoRange, fourcc(b"-8v0"), "Lossy_420YpCbCr8BiPlanarVideoRange", None),
    entry!(LossyYpCbCr420_8BiPlanarFullRange, fourcc(b"-8f0"), "Lossy_420YpCbCr8BiPlanarFullRange", None),
    entry!(LossyYpCbCr420_10PackedBiPlanarVideoRange, fourcc(b"-xv0"), "Lossy_420YpCbCr10PackedBiPlanarVideoRange", None),
    entry!(LossyYpCbCr422_10PackedBiPlanarVideoRange, fourcc(b"-xv2"), "Lossy_422YpCbCr10PackedBiPlanarVideoRange", None),
];

impl PixelFormat {
    fn entry(self) -> Option<&'static FormatEntry> {
        CATALOG.iter().find(|e| e.format == self)
    }

    /// Look up a format by its raw code. Unrecognized codes give [`PixelFormat::Unknown`].
    pub fn from_code(code: u32) -> Self {
        CATALOG
            .iter()
            .find(|e| e.code == code)
            .map_or(Self::Unknown, |e| e.format)
    }

    /// Raw code of the format; `0` for [`PixelFormat::Unknown`].
    pub fn code(self) -> u32 {
        self.entry().map_or(0, |e| e.code)
    }

    /// Short catalog name, e.g. `32BGRA`.
    pub fn name(self) -> &'static str {
        self.entry().map_or("unknown", |e| e.name)
    }

    /// Every named format in catalog order.
    pub fn all() -> impl Iterator<Item = PixelFormat> {
        CATALOG.iter().map(|e| e.format)
    }

    /// Geometry description, or `None` for unknown and compressed formats.
    pub fn describe(self) -> Option<FormatDescription> {
        let planes = self.entry()?.layout?;
        let is_planar = planes.len() > 1;
        Some(FormatDescription {
            format: self,
            is_planar,
            plane_count: if is_planar { planes.len() } else { 0 },
            planes,
        })
    }

    /// Whether the format stores more than one plane.
    pub fn is_planar(self) -> bool {
        self.describe().is_some_and(|d| d.is_planar)
    }

    /// Compressed formats are catalogued but carry no CPU-visible layout.
    pub fn is_compressed(self) -> bool {
        self.entry().is_some_and(|e| e.layout.is_none())
    }
}

/// Describe a raw format code.
pub fn describe(code: u32) -> Option<FormatDescription> {
    PixelFormat::from_code(code).describe()
}

impl Default for PixelFormat {
    fn default() -> Self {
        Self::Bgra32
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PixelFormat {
    type Err = BufferError;

    fn from_str(s: &str) -> Result<Self> {
        CATALOG
            .iter()
            .find(|e| e.name == s)
            .map(|e| e.format)
            .ok_or_else(|| BufferError::InvalidArgument(format!("unknown pixel format name: {s}")))
    }
}
