pub mod traits {
    pub mod container_stream;
    pub mod metadata_codec;
    pub mod type_handler;
}

pub mod models {
    pub mod encoders {
        pub mod parquet {
            pub mod data;
            pub mod metadata;
            pub mod statistics;
        }
    }
    pub mod decoders {
        pub mod parquet;
        pub mod thrift;
    }
    pub mod readers {
        pub mod column_reader;
        pub mod row_group;
    }
    pub mod writers {
        pub mod column_writer;
        pub mod row_group_writer;
    }
    pub mod streams {
        pub mod restricted;
    }
    pub mod types {
        pub mod column;
        pub mod metadata;
        pub mod parquet;
        pub mod schema;
    }
    pub mod buffers;
    pub mod file;
    pub mod footer;
    pub mod handlers;
    pub mod schema_tree;
    pub mod thrift_codec;
}

pub mod compression;
pub mod constants;
pub mod enums;
pub mod error;
pub mod options;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use crate::compression::Compression;
pub use crate::enums::{DataPageVersion, StreamCapabilities, WriterState};
pub use crate::error::{ParquetError, Result};
pub use crate::models::file::{ParquetFile, write_single_row_group};
pub use crate::models::footer::CustomMetadata;
pub use crate::models::readers::row_group::RowGroup;
pub use crate::models::types::column::{Column, ColumnValues};
pub use crate::models::types::schema::{DataField, DataType, Field, ListField, MapField, Schema, StructField};
pub use crate::models::writers::row_group_writer::WriteableRowGroup;
pub use crate::options::ParquetOptions;
pub use crate::traits::container_stream::ContainerStream;
