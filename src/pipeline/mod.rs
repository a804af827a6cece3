pub mod model; // Model Client + response schemas
pub mod extraction; // Test paper → name/score rows, CSV export
pub mod advice; // Study question → structured advice
