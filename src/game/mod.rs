pub mod chart;
pub mod gameplay;
pub mod measure;
pub mod modifiers;
pub mod note;
pub mod pool;
pub mod scroll;
pub mod timing;
pub mod timing_windows;
pub mod track;
