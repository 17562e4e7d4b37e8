//! On-demand team and event lookups against the results source.
//!
//! Each command fetches what it needs and renders one reply. No state, no
//! retries.

use anyhow::{anyhow, Context, Result};
use frc_watch_core::clients::tba::{count_awards, TbaAward, TbaEvent, TbaRobot, TbaTeam};
use frc_watch_core::clients::TbaClient;
use frc_watch_core::{
    team_number_from_key, Alliance, EmbedColor, Link, MatchId, Notification, ResultMatch,
};
use futures_util::future::try_join;

/// Award types that come with a blue banner, in display order.
pub const BLUE_BANNER_AWARDS: [(u32, &str); 5] = [
    (0, "Chairmans"),
    (69, "Chairmans Finalists"),
    (1, "Winner"),
    (3, "Woodie Flowers"),
    (74, "Skills Competition Winner"),
];

const USAGE: [(&str, &str, &str); 6] = [
    ("team", "frc_query team <team number>", "Info about an FRC team"),
    ("events", "frc_query events <team number> [year|all]", "Team's events"),
    ("event", "frc_query event <event key>", "Info about an FRC event"),
    ("matches", "frc_query matches <team number> <event key>", "Team's matches at event"),
    ("robots", "frc_query robots <team number>", "Team robot names"),
    ("help", "frc_query help [command]", "This message"),
];

const NONE: &str = "—";

/// Longest embed field value the chat API accepts.
const FIELD_LIMIT: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    Team { team: String },
    Events { team: String, year: YearFilter },
    Event { event_key: String },
    Matches { team: String, event_key: String },
    Robots { team: String },
    Help { command: Option<String> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum YearFilter {
    All,
    Season(u32),
}

impl YearFilter {
    /// Missing or `all` means every season.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim) {
            None => Ok(YearFilter::All),
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(YearFilter::All),
            Some(s) => s
                .parse::<u32>()
                .map(YearFilter::Season)
                .map_err(|_| anyhow!("Invalid year: {s} (expected a season like 2025, or 'all')")),
        }
    }

    fn season(&self) -> Option<u32> {
        match self {
            YearFilter::All => None,
            YearFilter::Season(y) => Some(*y),
        }
    }
}

impl Query {
    pub fn needs_results_source(&self) -> bool {
        !matches!(self, Query::Help { .. })
    }
}

/// Run one query and render its reply.
pub async fn execute(query: &Query, tba: &TbaClient) -> Result<Notification> {
    match query {
        Query::Team { team } => {
            let team = team_number_from_key(team);
            let (info, awards) = try_join(tba.team(team), tba.team_awards(team))
                .await
                .with_context(|| format!("TBA lookup for team {}", team))?;
            Ok(render_team(&info, &awards))
        }
        Query::Events { team, year } => {
            let team = team_number_from_key(team);
            let season = year.season();
            let (keys, events) = try_join(
                tba.team_event_keys(team, season),
                tba.team_events(team, season),
            )
            .await
            .with_context(|| format!("TBA event lookup for team {}", team))?;
            let info = tba
                .team(team)
                .await
                .with_context(|| format!("TBA lookup for team {}", team))?;
            Ok(render_events(&info, &keys, &events))
        }
        Query::Event { event_key } => {
            let event = tba
                .event(event_key)
                .await
                .with_context(|| format!("TBA lookup for event {}", event_key))?;
            Ok(render_event(&event))
        }
        Query::Matches { team, event_key } => {
            let team = team_number_from_key(team);
            let matches = tba
                .team_event_matches(team, event_key)
                .await
                .with_context(|| format!("TBA match lookup for team {} at {}", team, event_key))?;
            Ok(render_matches(team, event_key, matches))
        }
        Query::Robots { team } => {
            let team = team_number_from_key(team);
            let robots = tba
                .team_robots(team)
                .await
                .with_context(|| format!("TBA robot lookup for team {}", team))?;
            Ok(render_robots(team, &robots))
        }
        Query::Help { command } => Ok(render_help(command.as_deref())),
    }
}

fn or_none(value: &Option<String>) -> &str {
    value.as_deref().filter(|v| !v.trim().is_empty()).unwrap_or(NONE)
}

pub fn render_team(team: &TbaTeam, awards: &[TbaAward]) -> Notification {
    let number = team.team_number;
    let website = team
        .website
        .clone()
        .filter(|w| !w.trim().is_empty())
        .unwrap_or_else(|| format!("https://www.thebluealliance.com/team/{}", number));

    let wanted: Vec<u32> = BLUE_BANNER_AWARDS.iter().map(|(t, _)| *t).collect();
    let counts = count_awards(awards, &wanted);
    let total: usize = counts.values().sum();
    let banners = BLUE_BANNER_AWARDS
        .iter()
        .map(|(award_type, label)| {
            format!("**{}:** {}", label, counts.get(award_type).copied().unwrap_or(0))
        })
        .collect::<Vec<_>>()
        .join("\n");

    let rookie = team
        .rookie_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| NONE.to_string());

    let mut n = Notification::new(format!("FRC {}", number), EmbedColor::Brand)
        .field(
            "Location",
            format!(
                "**City:** {}\n**State/Prov.:** {}\n**Country:** {}\n**Postal Code:** {}",
                or_none(&team.city),
                or_none(&team.state_prov),
                or_none(&team.country),
                or_none(&team.postal_code),
            ),
            true,
        )
        .field(
            "Team Info",
            format!(
                "**Nickname:** {}\n**School:** {}\n**Rookie Year:** {}\n**Key:** {}",
                or_none(&team.nickname),
                or_none(&team.school_name),
                rookie,
                team.key,
            ),
            true,
        )
        .field(
            "Blue Banners",
            format!("{}\n**Total Blue Banners:** {}", banners, total),
            false,
        );
    n.links = vec![
        Link::new("TBA", website.as_str()),
        Link::new("FIRST", format!("https://frc-events.firstinspires.org/team/{}", number)),
        Link::new("Statbotics", format!("https://www.statbotics.io/team/{}", number)),
    ];
    n.url = Some(website);
    n
}

/// Join `lines` one per line. When that would pass `limit` characters, keep
/// as many as fit and end with an "… and N more" line.
fn fit_lines(lines: &[String], limit: usize) -> String {
    let full = lines.join("\n");
    if full.chars().count() <= limit {
        return full;
    }

    let mut kept = 0;
    let mut used = 0;
    for line in lines {
        let next = used + usize::from(kept > 0) + line.chars().count();
        let suffix = 1 + format!("… and {} more", lines.len() - kept - 1).chars().count();
        if next + suffix > limit {
            break;
        }
        used = next;
        kept += 1;
    }

    let mut out = lines[..kept].join("\n");
    if !out.is_empty() {
        out.push('\n');
    }
    out.push_str(&format!("… and {} more", lines.len() - kept));
    out
}

pub fn render_events(team: &TbaTeam, keys: &[String], events: &[TbaEvent]) -> Notification {
    let keys_field = if keys.is_empty() {
        "No events found.".to_string()
    } else {
        fit_lines(keys, FIELD_LIMIT)
    };
    let names: Vec<String> = events
        .iter()
        .map(|e| e.name.replace("(Cancelled)", "").trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();
    let names_field = if names.is_empty() {
        "No event names to display.".to_string()
    } else {
        fit_lines(&names, FIELD_LIMIT)
    };

    let mut n = Notification::new(format!("FRC Team {} Events", team.team_number), EmbedColor::Blue)
        .field("Event Keys", keys_field, true)
        .field("Event Names", names_field, true);
    n.url = team.website.clone().filter(|w| !w.trim().is_empty());
    n.footer = team.nickname.clone().filter(|nick| !nick.trim().is_empty());
    n
}

pub fn render_event(event: &TbaEvent) -> Notification {
    let dates = match (&event.start_date, &event.end_date) {
        (Some(start), Some(end)) if start != end => format!("{} to {}", start, end),
        (Some(start), _) => start.clone(),
        (None, Some(end)) => end.clone(),
        (None, None) => NONE.to_string(),
    };
    let location = [&event.city, &event.state_prov, &event.country]
        .iter()
        .filter_map(|part| part.as_deref())
        .filter(|part| !part.trim().is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let mut n = Notification::new(event.name.clone(), EmbedColor::Brand)
        .field("Dates", dates, true)
        .field(
            "Location",
            if location.is_empty() { NONE.to_string() } else { location },
            true,
        )
        .field("Type", or_none(&event.event_type_string), true)
        .field("Key", event.key.clone(), true);
    n.url = Some(
        event
            .website
            .clone()
            .filter(|w| !w.trim().is_empty())
            .unwrap_or_else(|| format!("https://www.thebluealliance.com/event/{}", event.key)),
    );
    n
}

fn level_order(comp_level: &str) -> u8 {
    match comp_level {
        "qm" => 0,
        "ef" => 1,
        "qf" => 2,
        "sf" => 3,
        "f" => 4,
        _ => 5,
    }
}

fn match_line(team: &str, m: &ResultMatch) -> String {
    let label = MatchId::from_results_fields(&m.comp_level, m.set_number, m.match_number)
        .map(|id| id.label())
        .unwrap_or_else(|| m.key.clone());

    let side = if m.red.teams.iter().any(|t| t == team) {
        Alliance::Red
    } else {
        Alliance::Blue
    };
    let marker = match side {
        Alliance::Red => "🔴",
        Alliance::Blue => "🔵",
    };

    if !m.is_completed() {
        return format!("{} {}: not played yet", marker, label);
    }

    let ours = m.alliance(side).score;
    let theirs = match side {
        Alliance::Red => m.blue.score,
        Alliance::Blue => m.red.score,
    };
    let result = match m.winning_alliance.or_else(|| m.winner_by_score()) {
        None => "T",
        Some(w) if w == side => "W",
        Some(_) => "L",
    };
    format!("{} {}: {}-{} {}", marker, label, ours, theirs, result)
}

pub fn render_matches(team: &str, event_key: &str, mut matches: Vec<ResultMatch>) -> Notification {
    matches.sort_by_key(|m| (level_order(&m.comp_level), m.set_number, m.match_number));

    let mut n = Notification::new(
        format!("FRC {} at {}", team, event_key),
        EmbedColor::Brand,
    );
    n.body = if matches.is_empty() {
        "No matches found.".to_string()
    } else {
        matches
            .iter()
            .map(|m| match_line(team, m))
            .collect::<Vec<_>>()
            .join("\n")
    };
    n.url = Some(format!(
        "https://www.thebluealliance.com/team/{}/{}",
        team,
        event_key.get(..4).unwrap_or_default()
    ));
    n
}

pub fn render_robots(team: &str, robots: &[TbaRobot]) -> Notification {
    let mut sorted: Vec<&TbaRobot> = robots.iter().collect();
    sorted.sort_by_key(|r| r.year);

    let mut n = Notification::new(format!("frc{}", team), EmbedColor::Brand);
    for robot in sorted {
        n = n.field(robot.year.to_string(), robot.robot_name.clone(), false);
    }
    if n.fields.is_empty() {
        n.body = "No robots on record.".to_string();
    }
    n
}

pub fn render_help(command: Option<&str>) -> Notification {
    let Some(command) = command else {
        let mut n = Notification::new("FRC Query - Help", EmbedColor::Brand);
        for (name, usage, about) in USAGE {
            n = n.field(name, format!("`{}` - {}", usage, about), false);
        }
        return n;
    };

    let command = command.trim().to_lowercase();
    match USAGE.iter().find(|(name, _, _)| *name == command) {
        Some((name, usage, _)) => {
            Notification::new(format!("FRC Query Help - {}", name), EmbedColor::Brand)
                .field(*name, format!("`{}`", usage), false)
        }
        None => Notification::new(
            format!("❓ `{}` is not a recognised command.", command),
            EmbedColor::Greyple,
        ),
    }
}
