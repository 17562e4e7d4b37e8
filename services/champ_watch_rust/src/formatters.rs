//! Notification renderers. Pure functions of their inputs, no I/O.

use frc_watch_core::{
    Alliance, EmbedColor, EventConfig, Link, MatchId, Notification, Prediction, ResultMatch,
    Side, TeamNumber,
};

use crate::rankings::RankHistory;

const TBA_MATCH_URL: &str = "https://www.thebluealliance.com/match";
const STATBOTICS_MATCH_URL: &str = "https://www.statbotics.io/match";

/// Everything the two pre-match notices show.
#[derive(Debug, Clone)]
pub struct UpcomingMatch<'a> {
    pub event: &'a EventConfig,
    pub label: &'a str,
    /// Display names of the tracked teams in the match
    pub team_names: &'a [String],
    pub side: Side,
    pub prediction: &'a Prediction,
    /// Canonical id, when the live label could be parsed
    pub match_id: Option<MatchId>,
    pub minutes_until: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Won,
    Lost,
    Tied,
    /// Tracked teams played on both alliances
    Split,
}

impl Outcome {
    pub fn for_side(side: Side, winner: Option<Alliance>) -> Self {
        match (side, winner) {
            (Side::Both, _) => Outcome::Split,
            (_, None) => Outcome::Tied,
            (Side::Only(ours), Some(w)) if ours == w => Outcome::Won,
            (Side::Only(_), Some(_)) => Outcome::Lost,
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Outcome::Won => "won! 🎉",
            Outcome::Lost => "lost 💔",
            Outcome::Tied => "tied 🤝",
            Outcome::Split => "faced each other ⚔️",
        }
    }

    fn color(&self) -> EmbedColor {
        match self {
            Outcome::Won => EmbedColor::Green,
            Outcome::Lost => EmbedColor::Red,
            Outcome::Tied | Outcome::Split => EmbedColor::Greyple,
        }
    }
}

pub fn alliance_text(side: Side) -> &'static str {
    match side {
        Side::Only(Alliance::Red) => "🔴 Red Alliance",
        Side::Only(Alliance::Blue) => "🔵 Blue Alliance",
        Side::Both => "🟪 Both Alliances",
    }
}

fn percent(p: f64) -> String {
    format!("{:.1}%", p * 100.0)
}

fn predicted_winner(prediction: &Prediction) -> String {
    prediction
        .winner
        .map(|w| w.as_str().to_uppercase())
        .unwrap_or_else(|| "UNKNOWN".to_string())
}

fn match_links(event: &EventConfig, match_id: Option<MatchId>, with_stream: bool) -> Vec<Link> {
    let mut links = Vec::new();
    if with_stream {
        links.push(Link::new("📺 Twitch Live", event.stream_url.as_str()));
    }
    if let Some(id) = match_id {
        links.push(Link::new(
            "🔵 View on TBA",
            format!("{}/{}", TBA_MATCH_URL, id.results_key(&event.results_key)),
        ));
        links.push(Link::new(
            "📊 View on Statbotics",
            format!("{}/{}", STATBOTICS_MATCH_URL, id.prediction_key(&event.results_key)),
        ));
    }
    links
}

fn team_list(teams: &[TeamNumber]) -> String {
    teams
        .iter()
        .map(|t| format!("• #{}", t))
        .collect::<Vec<_>>()
        .join("\n")
}

fn finish(mut n: Notification, footer: Option<&str>) -> Notification {
    n.footer = footer.map(str::to_string);
    n
}

/// "About to play": the match is on deck.
pub fn about_to_play(m: &UpcomingMatch<'_>, footer: Option<&str>) -> Notification {
    let mut n = Notification::new(
        format!("🛫 {} - {}", m.event.display_name, m.label),
        EmbedColor::Gold,
    );
    n.body = format!(
        "🤖 Team(s): **{}**\n\
         🎨 **Starting on:** {}\n\n\
         🏆 **Win Probability:** {} (Powered By Statbotics)\n\
         🔮 **Predicted Winner:** {}\n\n\
         🕑 Starts in approx **{} min**!",
        m.team_names.join(", "),
        alliance_text(m.side),
        percent(m.prediction.win_probability_for(m.side)),
        predicted_winner(m.prediction),
        m.minutes_until.max(0),
    );
    n.links = match_links(m.event, m.match_id, true);
    finish(n, footer)
}

/// "Starting now": the match is on the field.
pub fn starting_now(m: &UpcomingMatch<'_>, footer: Option<&str>) -> Notification {
    let mut n = Notification::new(
        format!("🔥 MATCH STARTING NOW on {}!", m.event.display_name),
        EmbedColor::Red,
    );
    n.body = format!(
        "🤖 Team(s): **{}**\n\
         🎨 **Starting on:** {}\n\n\
         🏆 **Win Probability:** {}\n\
         🔮 **Predicted Winner:** {}\n\n\
         🏟️ Field: {}\n\
         🕑 Match: {}",
        m.team_names.join(", "),
        alliance_text(m.side),
        percent(m.prediction.win_probability_for(m.side)),
        predicted_winner(m.prediction),
        m.event.display_name,
        m.label,
    );
    n.links = match_links(m.event, m.match_id, true);
    finish(n, footer)
}

fn result_id(m: &ResultMatch) -> Option<MatchId> {
    MatchId::from_results_fields(&m.comp_level, m.set_number, m.match_number)
}

fn result_title(event: &EventConfig, m: &ResultMatch) -> String {
    let label = result_id(m)
        .map(|id| id.label())
        .unwrap_or_else(|| format!("Match {}", m.match_number));
    format!("🏟️ {} - {}", event.display_name, label)
}

fn alliance_tag(alliance: Alliance, winner: Option<Alliance>) -> &'static str {
    match winner {
        None => "(Tie)",
        Some(w) if w == alliance => "(Winner)",
        Some(_) => "(Loser)",
    }
}

fn ranking_points(m: &ResultMatch, side: Side) -> String {
    let rp = |a: Alliance| {
        m.alliance(a)
            .ranking_points
            .map(|v| v.to_string())
            .unwrap_or_else(|| "—".to_string())
    };
    match side {
        Side::Only(a) => rp(a),
        Side::Both => format!("Red {} / Blue {}", rp(Alliance::Red), rp(Alliance::Blue)),
    }
}

pub fn rank_line(team: &str, ranks: &RankHistory) -> String {
    match ranks.current(team) {
        Some(now) if ranks.previous(team).is_some() => {
            format!("🏅 #{}: #{} {}", team, now, ranks.movement(team).marker())
        }
        _ => format!("🏅 #{}: Unknown", team),
    }
}

/// Final score for a completed match with tracked teams in it.
pub fn result(
    event: &EventConfig,
    m: &ResultMatch,
    tracked_in_match: &[TeamNumber],
    side: Side,
    ranks: &RankHistory,
    footer: Option<&str>,
) -> Notification {
    let winner = m.winning_alliance.or_else(|| m.winner_by_score());
    let outcome = Outcome::for_side(side, winner);

    let tracked = tracked_in_match
        .iter()
        .map(|t| format!("#{}", t))
        .collect::<Vec<_>>()
        .join(", ");
    let rank_lines = tracked_in_match
        .iter()
        .map(|t| rank_line(t, ranks))
        .collect::<Vec<_>>()
        .join("\n");

    let mut n = Notification::new(result_title(event, m), outcome.color());
    n.body = format!(
        "🤖 Team(s) {}\n{}\n\n\
         🔴 **Red Alliance** {}\n{}\n\n\
         🔵 **Blue Alliance** {}\n{}\n\n\
         🏅 **Score:** Red {} - Blue {}\n\
         📈 **RP Earned:** {}\n\
         {}",
        outcome.text(),
        tracked,
        alliance_tag(Alliance::Red, winner),
        team_list(&m.red.teams),
        alliance_tag(Alliance::Blue, winner),
        team_list(&m.blue.teams),
        m.red.score,
        m.blue.score,
        ranking_points(m, side),
        rank_lines,
    );
    n.links = match_links(event, result_id(m), false);
    finish(n, footer)
}
