pub mod punch;
