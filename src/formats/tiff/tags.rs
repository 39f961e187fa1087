//! TIFF tag constants and the field type width table

pub const NEW_SUBFILE_TYPE: u16 = 254;
pub const SUBFILE_TYPE: u16 = 255;

/// Image width in pixels
pub const IMAGE_WIDTH: u16 = 256;

/// Image height in pixels
pub const IMAGE_LENGTH: u16 = 257;

/// Bits per sample
pub const BITS_PER_SAMPLE: u16 = 258;

/// Compression scheme
pub const COMPRESSION: u16 = 259;

/// Photometric interpretation
pub const PHOTOMETRIC_INTERPRETATION: u16 = 262;

pub const THRESHHOLDING: u16 = 263;
pub const CELL_WIDTH: u16 = 264;
pub const CELL_LENGTH: u16 = 265;
pub const FILL_ORDER: u16 = 266;
pub const DOCUMENT_NAME: u16 = 269;

/// Image description (the comment)
pub const IMAGE_DESCRIPTION: u16 = 270;

pub const MAKE: u16 = 271;
pub const MODEL: u16 = 272;

/// Strip offsets
pub const STRIP_OFFSETS: u16 = 273;

pub const ORIENTATION: u16 = 274;

/// Samples per pixel
pub const SAMPLES_PER_PIXEL: u16 = 277;

/// Rows per strip
pub const ROWS_PER_STRIP: u16 = 278;

/// Strip byte counts
pub const STRIP_BYTE_COUNTS: u16 = 279;

pub const MIN_SAMPLE_VALUE: u16 = 280;
pub const MAX_SAMPLE_VALUE: u16 = 281;

/// X resolution
pub const X_RESOLUTION: u16 = 282;

/// Y resolution
pub const Y_RESOLUTION: u16 = 283;

/// Planar configuration
pub const PLANAR_CONFIGURATION: u16 = 284;

pub const PAGE_NAME: u16 = 285;
pub const X_POSITION: u16 = 286;
pub const Y_POSITION: u16 = 287;
pub const FREE_OFFSETS: u16 = 288;
pub const FREE_BYTE_COUNTS: u16 = 289;
pub const GRAY_RESPONSE_UNIT: u16 = 290;
pub const GRAY_RESPONSE_CURVE: u16 = 291;
pub const T4_OPTIONS: u16 = 292;
pub const T6_OPTIONS: u16 = 293;

/// Resolution unit
pub const RESOLUTION_UNIT: u16 = 296;

pub const PAGE_NUMBER: u16 = 297;
pub const TRANSFER_FUNCTION: u16 = 301;

/// Software
pub const SOFTWARE: u16 = 305;

pub const DATE_TIME: u16 = 306;
pub const ARTIST: u16 = 315;
pub const HOST_COMPUTER: u16 = 316;

/// Predictor
pub const PREDICTOR: u16 = 317;

pub const WHITE_POINT: u16 = 318;
pub const PRIMARY_CHROMATICITIES: u16 = 319;
pub const COLOR_MAP: u16 = 320;
pub const HALFTONE_HINTS: u16 = 321;

/// Tile width
pub const TILE_WIDTH: u16 = 322;

/// Tile length
pub const TILE_LENGTH: u16 = 323;

/// Tile offsets
pub const TILE_OFFSETS: u16 = 324;

/// Tile byte counts
pub const TILE_BYTE_COUNTS: u16 = 325;

pub const SUB_IFD: u16 = 330;
pub const INK_SET: u16 = 332;
pub const INK_NAMES: u16 = 333;
pub const NUMBER_OF_INKS: u16 = 334;
pub const DOT_RANGE: u16 = 336;
pub const TARGET_PRINTER: u16 = 337;
pub const EXTRA_SAMPLES: u16 = 338;

/// Sample format
pub const SAMPLE_FORMAT: u16 = 339;

pub const S_MIN_SAMPLE_VALUE: u16 = 340;
pub const S_MAX_SAMPLE_VALUE: u16 = 341;
pub const TRANSFER_RANGE: u16 = 342;
pub const JPEG_TABLES: u16 = 347;
pub const JPEG_PROC: u16 = 512;
pub const JPEG_INTERCHANGE_FORMAT: u16 = 513;
pub const JPEG_INTERCHANGE_FORMAT_LENGTH: u16 = 514;
pub const JPEG_RESTART_INTERVAL: u16 = 515;
pub const JPEG_LOSSLESS_PREDICTORS: u16 = 517;
pub const JPEG_POINT_TRANSFORMS: u16 = 518;
pub const JPEG_Q_TABLES: u16 = 519;
pub const JPEG_DC_TABLES: u16 = 520;
pub const JPEG_AC_TABLES: u16 = 521;
pub const Y_CB_CR_COEFFICIENTS: u16 = 529;
pub const Y_CB_CR_SUB_SAMPLING: u16 = 530;
pub const Y_CB_CR_POSITIONING: u16 = 531;
pub const REFERENCE_BLACK_WHITE: u16 = 532;
pub const COPYRIGHT: u16 = 33432;
pub const EXIF: u16 = 34665;
pub const EXPOSURE_TIME: u16 = 33434;
pub const F_NUMBER: u16 = 33437;
pub const DATE_TIME_ORIGINAL: u16 = 36867;
pub const USER_COMMENT: u16 = 37510;

/// Returns the name of a TIFF tag
pub fn tag_name(tag: u16) -> &'static str {
    match tag {
        NEW_SUBFILE_TYPE => "NewSubfileType",
        SUBFILE_TYPE => "SubfileType",
        IMAGE_WIDTH => "ImageWidth",
        IMAGE_LENGTH => "ImageLength",
        BITS_PER_SAMPLE => "BitsPerSample",
        COMPRESSION => "Compression",
        PHOTOMETRIC_INTERPRETATION => "PhotometricInterpretation",
        THRESHHOLDING => "Threshholding",
        CELL_WIDTH => "CellWidth",
        CELL_LENGTH => "CellLength",
        FILL_ORDER => "FillOrder",
        DOCUMENT_NAME => "DocumentName",
        IMAGE_DESCRIPTION => "ImageDescription",
        MAKE => "Make",
        MODEL => "Model",
        STRIP_OFFSETS => "StripOffsets",
        ORIENTATION => "Orientation",
        SAMPLES_PER_PIXEL => "SamplesPerPixel",
        ROWS_PER_STRIP => "RowsPerStrip",
        STRIP_BYTE_COUNTS => "StripByteCounts",
        MIN_SAMPLE_VALUE => "MinSampleValue",
        MAX_SAMPLE_VALUE => "MaxSampleValue",
        X_RESOLUTION => "XResolution",
        Y_RESOLUTION => "YResolution",
        PLANAR_CONFIGURATION => "PlanarConfiguration",
        PAGE_NAME => "PageName",
        X_POSITION => "XPosition",
        Y_POSITION => "YPosition",
        FREE_OFFSETS => "FreeOffsets",
        FREE_BYTE_COUNTS => "FreeByteCounts",
        GRAY_RESPONSE_UNIT => "GrayResponseUnit",
        GRAY_RESPONSE_CURVE => "GrayResponseCurve",
        T4_OPTIONS => "T4Options",
        T6_OPTIONS => "T6Options",
        RESOLUTION_UNIT => "ResolutionUnit",
        PAGE_NUMBER => "PageNumber",
        TRANSFER_FUNCTION => "TransferFunction",
        SOFTWARE => "Software",
        DATE_TIME => "DateTime",
        ARTIST => "Artist",
        HOST_COMPUTER => "HostComputer",
        PREDICTOR => "Predictor",
        WHITE_POINT => "WhitePoint",
        PRIMARY_CHROMATICITIES => "PrimaryChromaticities",
        COLOR_MAP => "ColorMap",
        HALFTONE_HINTS => "HalftoneHints",
        TILE_WIDTH => "TileWidth",
        TILE_LENGTH => "TileLength",
        TILE_OFFSETS => "TileOffsets",
        TILE_BYTE_COUNTS => "TileByteCounts",
        SUB_IFD => "SubIFD",
        INK_SET => "InkSet",
        INK_NAMES => "InkNames",
        NUMBER_OF_INKS => "NumberOfInks",
        DOT_RANGE => "DotRange",
        TARGET_PRINTER => "TargetPrinter",
        EXTRA_SAMPLES => "ExtraSamples",
        SAMPLE_FORMAT => "SampleFormat",
        S_MIN_SAMPLE_VALUE => "SMinSampleValue",
        S_MAX_SAMPLE_VALUE => "SMaxSampleValue",
        TRANSFER_RANGE => "TransferRange",
        JPEG_TABLES => "JPEGTables",
        JPEG_PROC => "JPEGProc",
        JPEG_INTERCHANGE_FORMAT => "JPEGInterchangeFormat",
        JPEG_INTERCHANGE_FORMAT_LENGTH => "JPEGInterchangeFormatLength",
        JPEG_RESTART_INTERVAL => "JPEGRestartInterval",
        JPEG_LOSSLESS_PREDICTORS => "JPEGLosslessPredictors",
        JPEG_POINT_TRANSFORMS => "JPEGPointTransforms",
        JPEG_Q_TABLES => "JPEGQTables",
        JPEG_DC_TABLES => "JPEGDCTables",
        JPEG_AC_TABLES => "JPEGACTables",
        Y_CB_CR_COEFFICIENTS => "YCbCrCoefficients",
        Y_CB_CR_SUB_SAMPLING => "YCbCrSubSampling",
        Y_CB_CR_POSITIONING => "YCbCrPositioning",
        REFERENCE_BLACK_WHITE => "ReferenceBlackWhite",
        COPYRIGHT => "Copyright",
        EXIF => "EXIF",
        EXPOSURE_TIME => "ExposureTime",
        F_NUMBER => "FNumber",
        DATE_TIME_ORIGINAL => "DateTimeOriginal",
        USER_COMMENT => "UserComment",
        _ => "Unknown",
    }
}

/// Field type codes as they appear in a directory entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Ascii,
    Short,
    Long,
    Rational,
    SByte,
    Undefined,
    SShort,
    SLong,
    SRational,
    Float,
    Double,
    Ifd,
    Long8,
    SLong8,
    Ifd8,
}

impl FieldType {
    /// Maps an on-disk type code to a field type
    pub fn from_code(code: u16) -> Option<Self> {
        Some(match code {
            1 => FieldType::Byte,
            2 => FieldType::Ascii,
            3 => FieldType::Short,
            4 => FieldType::Long,
            5 => FieldType::Rational,
            6 => FieldType::SByte,
            7 => FieldType::Undefined,
            8 => FieldType::SShort,
            9 => FieldType::SLong,
            10 => FieldType::SRational,
            11 => FieldType::Float,
            12 => FieldType::Double,
            13 => FieldType::Ifd,
            16 => FieldType::Long8,
            17 => FieldType::SLong8,
            18 => FieldType::Ifd8,
            _ => return None,
        })
    }

    /// On-disk type code
    pub fn code(&self) -> u16 {
        match self {
            FieldType::Byte => 1,
            FieldType::Ascii => 2,
            FieldType::Short => 3,
            FieldType::Long => 4,
            FieldType::Rational => 5,
            FieldType::SByte => 6,
            FieldType::Undefined => 7,
            FieldType::SShort => 8,
            FieldType::SLong => 9,
            FieldType::SRational => 10,
            FieldType::Float => 11,
            FieldType::Double => 12,
            FieldType::Ifd => 13,
            FieldType::Long8 => 16,
            FieldType::SLong8 => 17,
            FieldType::Ifd8 => 18,
        }
    }

    /// Size in bytes of one element of this type
    pub fn bytes_per_element(&self) -> usize {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float | FieldType::Ifd => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Returns the name of this field type
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Byte => "BYTE",
            FieldType::Ascii => "ASCII",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Rational => "RATIONAL",
            FieldType::SByte => "SBYTE",
            FieldType::Undefined => "UNDEFINED",
            FieldType::SShort => "SSHORT",
            FieldType::SLong => "SLONG",
            FieldType::SRational => "SRATIONAL",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Ifd => "IFD",
            FieldType::Long8 => "LONG8",
            FieldType::SLong8 => "SLONG8",
            FieldType::Ifd8 => "IFD8",
        }
    }
}

/// Returns the name of a raw field type code
pub fn field_type_name(code: u16) -> &'static str {
    FieldType::from_code(code).map_or("Unknown", |t| t.name())
}
