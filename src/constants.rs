pub const OFFSET_X: f64 = 0.000396296382;
pub const OFFSET_Y: f64 = 0.000357551447;
pub const TARGET_TILE_SIZE: u32 = 640;
pub const HTTP_TIMEOUT_SECONDS: u64 = 10;
pub const TILE_FETCH_RETRIES: usize = 2;
pub const MAX_FILENAME_LEN: usize = 50;
pub const USER_AGENT: &str = "satmosaic/0.1";
pub const COMPOSITE_OUTPUT: &str = "input_images/image.png";
