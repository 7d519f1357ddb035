pub mod bitlist;
pub mod consts;
pub mod containers;
pub mod phase;
pub mod primitives;
