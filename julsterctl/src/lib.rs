//! Terminal front-end for Julster: setup, a token check, the game loop and
//! link scanning.

pub mod commands;
pub mod input;
pub mod scan;
pub mod terminal;
