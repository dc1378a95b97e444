use miette::Diagnostic;
use thiserror::Error;

/// Main error type for tilestitch operations
#[derive(Error, Diagnostic, Debug)]
pub enum StitchError {
    #[error("IO error: {0}")]
    #[diagnostic(code(tilestitch::io))]
    IoError(#[from] std::io::Error),

    #[error("IO error with {path}: {message}")]
    #[diagnostic(code(tilestitch::io))]
    Io {
        path: std::path::PathBuf,
        message: String,
    },

    #[error("Parse error: {message}")]
    #[diagnostic(code(tilestitch::parse))]
    Parse {
        message: String,
        #[help]
        help: Option<String>,
    },

    #[error("No valid x,y named files")]
    #[diagnostic(
        code(tilestitch::no_tiles),
        help("Tiles must be named `<x>,<y>.<ext>` with integer coordinates, e.g. `0,0.png`")
    )]
    NoValidTiles,

    #[error("Target canvas too large: {width}×{height} exceeds max dimension {max}")]
    #[diagnostic(code(tilestitch::canvas_too_large))]
    CanvasTooLarge { width: u64, height: u64, max: u32 },

    #[error("Target canvas has too many pixels: {width}×{height} = {pixels} px (max {max})")]
    #[diagnostic(code(tilestitch::too_many_pixels))]
    TooManyPixels {
        width: u64,
        height: u64,
        pixels: u64,
        max: u64,
    },

    #[error("Reference tile {identifier} has no pixels")]
    #[diagnostic(code(tilestitch::zero_sized_tile))]
    ZeroSizedTile { identifier: String },

    #[error(
        "Tile {identifier} is {}×{}, expected {}×{}",
        .actual.0, .actual.1, .expected.0, .expected.1
    )]
    #[diagnostic(
        code(tilestitch::tile_size_mismatch),
        help("All tiles must share the first tile's dimensions")
    )]
    TileSizeMismatch {
        identifier: String,
        expected: (u32, u32),
        actual: (u32, u32),
    },

    #[error("Failed to decode tile {identifier}: {message}")]
    #[diagnostic(code(tilestitch::decode))]
    TileDecode { identifier: String, message: String },

    #[error("Failed to allocate a {width}×{height} output surface")]
    #[diagnostic(
        code(tilestitch::alloc),
        help("Try a smaller tile set or free some memory")
    )]
    SurfaceAllocation { width: u32, height: u32 },

    #[error("Failed to encode output image: {message}")]
    #[diagnostic(code(tilestitch::encode))]
    Encode { message: String },

    #[error("Composition was cancelled")]
    #[diagnostic(code(tilestitch::cancelled))]
    Cancelled,

    #[error("Worker error: {message}")]
    #[diagnostic(code(tilestitch::worker))]
    Worker { message: String },
}

pub type Result<T> = std::result::Result<T, StitchError>;
