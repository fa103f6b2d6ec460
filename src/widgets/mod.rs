pub mod chart;
pub mod controls;
pub mod debug;
pub mod pivot_table;
pub mod sidebar;
