//! Redis implementation of the watermark repository.

mod watermark_repository;

pub use watermark_repository::{
    format_watermark, parse_watermark, RedisWatermarkRepository, WATERMARK_FIELD,
};
