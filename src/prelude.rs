pub use super::{
    Allele, BedMatrix, BedSource, BedWriter, BedWriterBuilder, ChunkReader, MatrixWriter,
    StorageMode, Strides,
};
