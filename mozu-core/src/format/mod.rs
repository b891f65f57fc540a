pub mod archive;
pub mod charset;
pub mod text;

pub use archive::{Archive, ContainerWarning, Unpacked};
pub use charset::{CharTable, CharTableBuilder, GeneratedTable};
pub use text::{Terminator, TextCodec, TextField};
