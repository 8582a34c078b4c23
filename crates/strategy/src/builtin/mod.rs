pub mod echo;
pub mod storage_demo;
