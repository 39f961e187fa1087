//! Configuration for the saver and the command-line tool
//!
//! [`SaverConfig`] holds the writer settings that stay fixed for one output
//! file. It can be built in code, or loaded from a JSON file:
//!
//! ```json
//! { "byte_order": "big-endian", "big_tiff": true, "codec": { "deflate_level": 9 } }
//! ```
//!
//! Missing fields take their defaults. [`Cli`] is the clap definition of the
//! `tiff-saver` binary.

use std::fs;
use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::compression::CodecOptions;
use crate::error::{Error, Result};
use crate::formats::tiff::TagValue;
use crate::io::ByteOrder;

// =============================================================================
// Saver configuration
// =============================================================================

/// Settings for one [`TiffSaver`](crate::formats::tiff::TiffSaver)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverConfig {
    /// Byte order of the output file
    pub byte_order: ByteOrder,
    /// Write BigTIFF (8-byte offsets) instead of classic TIFF
    pub big_tiff: bool,
    /// Planes are written once, in order, and never revisited
    ///
    /// Skips re-reading the output before each plane.
    pub sequential: bool,
    /// Options passed to the codec for every chunk
    pub codec: CodecOptions,
}

impl SaverConfig {
    /// Reads a configuration from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parses a configuration from JSON text
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map_err(|e| Error::InvalidFormat(format!("Invalid saver configuration: {}", e)))
    }

    pub fn is_little_endian(&self) -> bool {
        self.byte_order.is_little()
    }
}

// =============================================================================
// CLI Arguments
// =============================================================================

/// tiff-saver - inspect and edit TIFF and BigTIFF files in place.
#[derive(Parser, Debug, Clone)]
#[command(name = "tiff-saver")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// JSON file with saver settings for commands that write new files
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the header and every directory of a file
    Info(InfoArgs),

    /// Replace the ImageDescription of a directory
    Comment(CommentArgs),

    /// Replace the value of any tag already present in a directory
    SetTag(SetTagArgs),

    /// Write a zero-filled 8-bit grayscale image
    Blank(BlankArgs),
}

#[derive(Args, Debug, Clone)]
pub struct InfoArgs {
    /// TIFF file to read
    pub file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct CommentArgs {
    /// TIFF file to edit
    pub file: PathBuf,

    /// New description text
    pub text: String,

    /// Directory index
    #[arg(long, default_value_t = 0)]
    pub ifd: usize,
}

#[derive(Args, Debug, Clone)]
pub struct SetTagArgs {
    /// TIFF file to edit
    pub file: PathBuf,

    /// Directory index
    #[arg(long, default_value_t = 0)]
    pub ifd: usize,

    /// Numeric tag id
    #[arg(long)]
    pub tag: u16,

    /// How the values are stored
    #[arg(long, value_enum, default_value_t = ValueKindArg::Long)]
    pub kind: ValueKindArg,

    /// New value(s); text values are joined with spaces
    #[arg(required = true)]
    pub values: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct BlankArgs {
    /// File to create
    pub file: PathBuf,

    #[arg(long)]
    pub width: u32,

    #[arg(long)]
    pub height: u32,

    /// Compression tag code (1 none, 5 LZW, 8 deflate, 32773 PackBits)
    #[arg(long, default_value_t = 1)]
    pub compression: u16,

    /// Square tile size; strips are written when absent
    #[arg(long)]
    pub tile: Option<u32>,
}

impl Cli {
    /// Saver settings from `--config`, or the defaults
    pub fn saver_config(&self) -> Result<SaverConfig> {
        match &self.config {
            Some(path) => SaverConfig::from_json_file(path),
            None => Ok(SaverConfig::default()),
        }
    }
}

/// Value shapes accepted by `set-tag`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKindArg {
    Short,
    Long,
    Text,
}

impl SetTagArgs {
    /// Builds the tag value from the command-line strings
    pub fn value(&self) -> Result<TagValue> {
        match self.kind {
            ValueKindArg::Text => Ok(TagValue::Text(self.values.join(" "))),
            ValueKindArg::Short => {
                let values = self
                    .values
                    .iter()
                    .map(|v| parse_number::<u16>(v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TagValue::Shorts(values))
            }
            ValueKindArg::Long => {
                let values = self
                    .values
                    .iter()
                    .map(|v| parse_number::<u64>(v))
                    .collect::<Result<Vec<_>>>()?;
                Ok(TagValue::Longs(values))
            }
        }
    }
}

fn parse_number<T: std::str::FromStr>(text: &str) -> Result<T> {
    text.parse()
        .map_err(|_| Error::InvalidFormat(format!("Not a valid number: {}", text)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = SaverConfig::default();
        assert!(config.is_little_endian());
        assert!(!config.big_tiff);
        assert!(!config.sequential);
        assert_eq!(config.codec, CodecOptions::default());
    }

    #[test]
    fn test_config_from_json() {
        let config =
            SaverConfig::from_json(r#"{"byte_order": "big-endian", "big_tiff": true, "codec": {"deflate_level": 9}}"#)
                .unwrap();
        assert_eq!(config.byte_order, ByteOrder::BigEndian);
        assert!(config.big_tiff);
        assert!(!config.sequential);
        assert_eq!(config.codec.deflate_level, 9);
    }

    #[test]
    fn test_config_from_json_rejects_garbage() {
        assert!(matches!(
            SaverConfig::from_json("{\"big_tiff\": 3}"),
            Err(Error::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_config_json_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"sequential": true}"#).unwrap();
        let config = SaverConfig::from_json_file(file.path()).unwrap();
        assert!(config.sequential);
    }

    #[test]
    fn test_cli_set_tag() {
        let cli = Cli::parse_from([
            "tiff-saver", "set-tag", "a.tif", "--ifd", "1", "--tag", "258", "--kind", "short", "8", "8", "8",
        ]);
        let Command::SetTag(args) = cli.command else {
            panic!("expected set-tag");
        };
        assert_eq!(args.ifd, 1);
        assert_eq!(args.tag, 258);
        assert_eq!(args.value().unwrap(), TagValue::Shorts(vec![8, 8, 8]));
    }

    #[test]
    fn test_cli_text_and_verbose() {
        let cli = Cli::parse_from(["tiff-saver", "-v", "set-tag", "a.tif", "--tag", "270", "--kind", "text", "hello", "world"]);
        assert!(cli.verbose);
        let Command::SetTag(args) = cli.command else {
            panic!("expected set-tag");
        };
        assert_eq!(args.value().unwrap(), TagValue::Text("hello world".into()));
    }

    #[test]
    fn test_cli_rejects_bad_number() {
        let cli = Cli::parse_from(["tiff-saver", "set-tag", "a.tif", "--tag", "256", "abc"]);
        let Command::SetTag(args) = cli.command else {
            panic!("expected set-tag");
        };
        assert!(args.value().is_err());
    }

    #[test]
    fn test_cli_blank_with_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        fs::write(file.path(), r#"{"big_tiff": true, "codec": {"deflate_level": 1}}"#).unwrap();
        let path = file.path().to_string_lossy().to_string();
        let cli = Cli::parse_from([
            "tiff-saver", "blank", "out.tif", "--width", "64", "--height", "32", "--tile", "16", "--config", path.as_str(),
        ]);
        let config = cli.saver_config().unwrap();
        assert!(config.big_tiff);
        assert_eq!(config.codec.deflate_level, 1);
        let Command::Blank(args) = cli.command else {
            panic!("expected blank");
        };
        assert_eq!((args.width, args.height, args.compression, args.tile), (64, 32, 1, Some(16)));
    }

    #[test]
    fn test_cli_config_defaults_without_flag() {
        let cli = Cli::parse_from(["tiff-saver", "info", "a.tif"]);
        assert_eq!(cli.saver_config().unwrap(), SaverConfig::default());
    }

    #[test]
    fn test_cli_comment() {
        let cli = Cli::parse_from(["tiff-saver", "comment", "a.tif", "new text"]);
        let Command::Comment(args) = cli.command else {
            panic!("expected comment");
        };
        assert_eq!((args.ifd, args.text.as_str()), (0, "new text"));
    }
}
