pub mod error;
pub mod stitch;
pub mod palette;
pub mod pattern;
pub mod header;
pub mod layout;
pub mod codec;
pub mod io_stream;
pub mod file;

pub use error::{FormatError, Result, StreamKind, VipError};
pub use codec::{CodecId, StreamCodec, get_codec};
pub use header::{HoopSize, VipHeader};
pub use io_stream::{VipReader, VipWriter};
pub use pattern::{Pattern, Rgb, Stitch, Thread};
pub use stitch::StitchType;
pub use file::{read_vip, write_vip, ReadOptions, WriteOptions};
