pub mod clock;
pub mod config;
pub mod error;
pub mod fsm_explore;
pub mod http;
pub mod ir_transport;
pub mod jtech;
pub mod matrix;
pub mod mv_screen;
pub mod orchestrator;
pub mod output;
pub mod stb;
pub mod tv;
pub mod volume;
