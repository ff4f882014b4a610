use std::io::Write;

use serde::{Deserialize, Serialize};

use crate::psqt::PAWN_EG;

fn default_futility_margin() -> i32 {
    // Just under one end-game pawn per remaining ply
    PAWN_EG * 95 / 100
}

/// Tunable pruning and reduction thresholds. Serialisable so tuning runs
/// can persist and reload a parameter set as JSON.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchParameters {
    // Razoring
    pub razor_depth: i32,
    pub razor_margins: [i32; 5],

    // Reverse futility (beta) pruning
    pub beta_pruning_depth: i32,

    // Null move
    pub null_move_depth: i32,

    // Internal iterative deepening
    pub iid_depth: i32,

    // Futility and late-move pruning in the move loop
    pub futility_depth: i32,
    pub lmp_depth: i32,
    pub lmp_counts: [i32; 9],

    // Check extension ceiling for non-PV nodes
    pub check_extension_depth: i32,

    // Aspiration window growth cap
    pub aspiration_max_margin: i32,

    // Derived from the evaluator's pawn value; recomputed after load
    #[serde(skip, default = "default_futility_margin")]
    pub futility_margin: i32,
}

impl Default for SearchParameters {
    fn default() -> Self {
        Self {
            razor_depth: 4,
            razor_margins: [0, 330, 360, 440, 510],
            beta_pruning_depth: 8,
            null_move_depth: 2,
            iid_depth: 6,
            futility_depth: 8,
            lmp_depth: 8,
            lmp_counts: [0, 2, 4, 7, 10, 15, 20, 28, 38],
            check_extension_depth: 6,
            aspiration_max_margin: 640,
            futility_margin: default_futility_margin(),
        }
    }
}

impl SearchParameters {
    pub fn save_to_json(&self, path: &str) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(path)?;
        file.write_all(json.as_bytes())
    }

    pub fn load_from_json(path: &str) -> std::io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        let mut params: SearchParameters = serde_json::from_reader(reader)?;
        params.futility_margin = default_futility_margin();
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip() {
        let mut params = SearchParameters::default();
        params.razor_depth = 3;
        params.lmp_counts[1] = 5;

        let json = serde_json::to_string(&params).unwrap();
        let back: SearchParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(back.razor_depth, 3);
        assert_eq!(back.lmp_counts[1], 5);
        assert_eq!(back.futility_margin, default_futility_margin());
    }
}
