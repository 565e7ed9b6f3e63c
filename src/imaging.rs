pub(crate) mod channels;
pub(crate) mod layers;
pub(crate) mod quantize;
pub(crate) mod service;
