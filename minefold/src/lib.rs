//! Guess-free Minesweeper on identified surfaces.
//!
//! The board's apparent edges can be glued into a torus, Möbius band, Klein
//! bottle or projective plane ([`topology`]), which strips away the
//! information-rich borders of the classical game. [`generator`] rejection-
//! samples mine placements until [`solver`] can prove that every non-mine
//! cell is reachable by forced deduction from the first click, so a player
//! never has to guess. [`board`] holds one game's state, [`game`] the
//! host-level phase machine around it.

pub mod board;
pub mod config;
pub mod game;
pub mod generator;
pub mod solver;
pub mod topology;
