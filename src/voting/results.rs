use crate::models::{Tally, VoterMap};

#[derive(Debug, Clone, PartialEq)]
pub struct OptionResult {
    pub option: String,
    pub votes: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoterLine {
    pub name: String,
    pub choice: String,
    // Only filled in for the privileged view.
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PollResults {
    pub question: String,
    pub rows: Vec<OptionResult>,
    pub total: u64,
    pub voters: Vec<VoterLine>,
}

impl PollResults {
    // Options holding the most votes; empty before the first vote.
    pub fn leaders(&self) -> Vec<&str> {
        let top = self.rows.iter().map(|row| row.votes).max().unwrap_or(0);
        if top == 0 {
            return Vec::new();
        }
        self.rows
            .iter()
            .filter(|row| row.votes == top)
            .map(|row| row.option.as_str())
            .collect()
    }
}

pub fn calculate_results(
    question: &str,
    options: &[String],
    tally: &Tally,
    voters: &VoterMap,
    privileged: bool,
) -> PollResults {
    let total = tally.total();

    let rows = options
        .iter()
        .map(|option| {
            let votes = tally.get(option);
            OptionResult {
                option: option.clone(),
                votes,
                percent: percentage(votes, total),
            }
        })
        .collect();

    let voters = voters
        .chronological()
        .into_iter()
        .map(|(_, record)| VoterLine {
            name: record.name.clone(),
            choice: record.choice.clone(),
            address: if privileged { record.address.clone() } else { None },
        })
        .collect();

    PollResults {
        question: question.to_string(),
        rows,
        total,
        voters,
    }
}

fn percentage(votes: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (votes as f64 * 1000.0 / total as f64).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Identifier, VoterRecord};
    use chrono::{Duration, Utc};

    fn options() -> Vec<String> {
        vec!["A".to_string(), "B".to_string(), "C".to_string()]
    }

    #[test]
    fn empty_poll_has_zero_percentages_and_no_leader() {
        let results = calculate_results(
            "Q?",
            &options(),
            &Tally::zeroed(&options()),
            &VoterMap::default(),
            false,
        );
        assert_eq!(results.total, 0);
        assert!(results.rows.iter().all(|row| row.percent == 0.0));
        assert!(results.leaders().is_empty());
    }

    #[test]
    fn percentages_round_to_one_decimal() {
        let mut tally = Tally::zeroed(&options());
        tally.increment("A");
        tally.increment("B");
        tally.increment("B");

        let results = calculate_results("Q?", &options(), &tally, &VoterMap::default(), false);

        assert_eq!(results.total, 3);
        assert_eq!(results.rows[0].percent, 33.3);
        assert_eq!(results.rows[1].percent, 66.7);
        assert_eq!(results.rows[2].percent, 0.0);
        assert_eq!(results.leaders(), vec!["B"]);
    }

    #[test]
    fn address_only_visible_when_privileged() {
        let mut voters = VoterMap::default();
        let now = Utc::now();
        voters.insert_new(
            Identifier::new("ffff000000000000"),
            VoterRecord {
                name: "Later".to_string(),
                choice: "B".to_string(),
                address: Some("10.0.0.2".to_string()),
                voted_at: now,
            },
        );
        voters.insert_new(
            Identifier::new("0000000000000000"),
            VoterRecord {
                name: "Earlier".to_string(),
                choice: "A".to_string(),
                address: Some("10.0.0.1".to_string()),
                voted_at: now - Duration::minutes(5),
            },
        );
        let tally = Tally::zeroed(&options());

        let public = calculate_results("Q?", &options(), &tally, &voters, false);
        assert!(public.voters.iter().all(|line| line.address.is_none()));

        let private = calculate_results("Q?", &options(), &tally, &voters, true);
        assert_eq!(private.voters[0].name, "Earlier");
        assert_eq!(private.voters[0].address.as_deref(), Some("10.0.0.1"));
        assert_eq!(private.voters[1].address.as_deref(), Some("10.0.0.2"));
    }
}
