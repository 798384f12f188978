pub mod avatar;
pub mod heading;
