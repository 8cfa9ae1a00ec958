mod decode;
mod payload;
pub(crate) mod sampler;

pub use decode::decode_frame;
pub use payload::interpret_payload;
