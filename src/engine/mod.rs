// ── Assistant Engine ───────────────────────────────────────────────────────
// The page-aware chat pipeline: scan the hosting document, assemble one
// prompt per user turn, call the model, act on the commands embedded in the
// reply. The rendering surface is injected (surface.rs), so everything here
// runs headlessly.

pub mod assistant;
pub mod brain;
pub mod commands;
pub mod config;
pub mod context;
pub mod providers;
pub mod scanner;
pub mod surface;
