use std::io;
use std::time::{Duration, Instant};

use chrono::{Local, TimeZone};
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::prelude::*;
use ratatui::style::{Color, Modifier, Style};
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph};

use bpm_terminal::dataset_cache::{DatasetCache, unix_now};
use bpm_terminal::state::{AppState, Focus, PlayerRow};
use bpm_terminal::stats_fetch::load_players;
use bpm_terminal::view::{MatchupCall, MatchupView, TopPerformer};

struct App {
    state: AppState,
    cache: DatasetCache,
    should_quit: bool,
}

impl App {
    fn on_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') => self.should_quit = true,
            KeyCode::Tab => self.state.cycle_focus(),
            KeyCode::BackTab => self.state.cycle_focus_back(),
            KeyCode::Char('j') | KeyCode::Down => self.state.bump_down(),
            KeyCode::Char('k') | KeyCode::Up => self.state.bump_up(),
            KeyCode::Left => {
                if self.state.focus == Focus::MinGames {
                    self.state.dec_min_games();
                } else {
                    self.state.bump_up();
                }
            }
            KeyCode::Right => {
                if self.state.focus == Focus::MinGames {
                    self.state.inc_min_games();
                } else {
                    self.state.bump_down();
                }
            }
            KeyCode::Char(' ') | KeyCode::Enter => {
                if self.state.focus == Focus::InjuredList {
                    self.state.toggle_injured_at_cursor();
                }
            }
            KeyCode::Char('c') => self.state.clear_injured(),
            KeyCode::Char('s') => self.state.cycle_sort(),
            KeyCode::Char('o') => self.state.toggle_order(),
            KeyCode::Char('r') | KeyCode::Char('R') => self.refresh_data(),
            KeyCode::PageDown => {
                let total = self.state.view().combined.len();
                self.state.scroll_combined_down(total);
            }
            KeyCode::PageUp => self.state.scroll_combined_up(),
            KeyCode::Char('?') => self.state.help_overlay = !self.state.help_overlay,
            _ => {}
        }
    }

    /// Synchronous refetch through the cache. The loop blocks while the
    /// request runs; that is the whole concurrency model here.
    fn refresh_data(&mut self) {
        self.state.push_log("[INFO] Refreshing advanced stats...");
        match self.cache.force_refresh(unix_now(), load_players) {
            Ok((rows, fetched_at)) => {
                let count = rows.len();
                self.state.set_players(rows, fetched_at);
                let _ = self.cache.persist();
                self.state
                    .push_log(format!("[INFO] Loaded {count} player rows"));
            }
            Err(err) => {
                // No stale fallback: the dashboard blanks until a refresh
                // succeeds.
                self.state.load_error = Some(err.to_string());
                self.state.push_log(format!("[WARN] Refresh failed: {err}"));
            }
        }
    }
}

fn main() -> io::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");

    let cache = DatasetCache::from_env();
    cache.warm_from_disk();

    println!("Loading NBA advanced stats from Basketball-Reference...");
    let (players, fetched_at) = match cache.get_or_load(unix_now(), load_players) {
        Ok(loaded) => loaded,
        Err(err) => {
            eprintln!("error: {err}");
            return Ok(());
        }
    };
    let _ = cache.persist();

    let mut state = AppState::new(players);
    state.fetched_at = Some(fetched_at);
    state.push_log(format!(
        "[INFO] Loaded {} player rows",
        state.players().len()
    ));

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut app = App {
        state,
        cache,
        should_quit: false,
    };
    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        eprintln!("error: {err}");
    }
    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|f| ui(f, app))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    app.on_key(key);
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = Instant::now();
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

fn ui(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(frame.size());

    let view = app.state.view();

    let header =
        Paragraph::new(header_text(&app.state)).block(Block::default().borders(Borders::BOTTOM));
    frame.render_widget(header, chunks[0]);

    if let Some(err) = &app.state.load_error {
        render_load_error(frame, chunks[1], err);
    } else {
        let body = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(38), Constraint::Min(40)])
            .split(chunks[1]);
        render_sidebar(frame, body[0], &app.state);
        render_dashboard(frame, body[1], &app.state, &view);
    }

    let footer = Paragraph::new(footer_text()).style(Style::default().fg(Color::DarkGray));
    frame.render_widget(footer, chunks[2]);

    if app.state.help_overlay {
        render_help_overlay(frame, frame.size());
    }
}

fn header_text(state: &AppState) -> String {
    let sel = state.selection();
    let order = if state.descending { "DESC" } else { "ASC" };
    let stamp = state
        .fetched_at
        .and_then(|secs| Local.timestamp_opt(secs as i64, 0).single())
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "NBA BPM IMPACT | {} vs {} | Min G: {} | Sort: {} {} | Data: {}",
        label_or_dash(&sel.team1),
        label_or_dash(&sel.team2),
        state.min_games,
        state.sort_by.label(),
        order,
        stamp
    )
}

fn footer_text() -> &'static str {
    "Tab Focus | j/k/↑/↓ Move | Space Toggle injured | c Clear | s Sort | o Order | PgUp/PgDn Table | r Refresh | ? Help | q Quit"
}

fn label_or_dash(team: &str) -> &str {
    if team.is_empty() { "-" } else { team }
}

fn focus_block(title: String, focused: bool) -> Block<'static> {
    let mut block = Block::default().title(title).borders(Borders::ALL);
    if focused {
        block = block.border_style(Style::default().fg(Color::Cyan));
    }
    block
}

fn render_sidebar(frame: &mut Frame, area: Rect, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(4),
            Constraint::Length(5),
        ])
        .split(area);

    render_injured_list(frame, chunks[0], state);
    render_min_games(frame, chunks[1], state);
    render_matchup_select(frame, chunks[2], state);
    render_sort_select(frame, chunks[3], state);
    render_console(frame, chunks[4], state);
}

fn render_injured_list(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = state.focus == Focus::InjuredList;
    let block = focus_block(format!("Injured ({})", state.injured.len()), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let players = state.players();
    if players.is_empty() || inner.height == 0 {
        let empty = Paragraph::new("No players loaded").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let visible = inner.height as usize;
    let (start, end) = visible_range(state.player_cursor, players.len(), visible);
    for (i, idx) in (start..end).enumerate() {
        let row_area = Rect {
            x: inner.x,
            y: inner.y + i as u16,
            width: inner.width,
            height: 1,
        };
        let row = &players[idx];
        let marker = if state.injured.contains(&row.player) {
            "[x]"
        } else {
            "[ ]"
        };
        let line = format!("{marker} {:<3} {}", row.team, row.player);
        let style = if focused && idx == state.player_cursor {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else if state.injured.contains(&row.player) {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        frame.render_widget(Paragraph::new(line).style(style), row_area);
    }
}

fn render_min_games(frame: &mut Frame, area: Rect, state: &AppState) {
    let block = focus_block("Min Games".to_string(), state.focus == Focus::MinGames);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.width < 10 || inner.height == 0 {
        return;
    }

    // Crude slider: filled cells proportional to the 1..=82 range.
    let track = (inner.width as usize).saturating_sub(9);
    let filled = (state.min_games as usize * track) / 82;
    let mut bar = String::new();
    for i in 0..track {
        bar.push(if i < filled { '█' } else { '░' });
    }
    let text = format!("{bar} {:>2} / 82", state.min_games);
    frame.render_widget(Paragraph::new(text), inner);
}

fn render_matchup_select(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = matches!(state.focus, Focus::TeamOne | Focus::TeamTwo);
    let block = focus_block("Matchup".to_string(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let sel = state.selection();
    let lines = [
        (
            format!("Team 1: {}", label_or_dash(&sel.team1)),
            state.focus == Focus::TeamOne,
        ),
        (
            format!("Team 2: {}", label_or_dash(&sel.team2)),
            state.focus == Focus::TeamTwo,
        ),
    ];
    render_option_lines(frame, inner, &lines);
}

fn render_sort_select(frame: &mut Frame, area: Rect, state: &AppState) {
    let focused = matches!(state.focus, Focus::SortColumn | Focus::SortOrder);
    let block = focus_block("Sort".to_string(), focused);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let order = if state.descending {
        "Descending"
    } else {
        "Ascending"
    };
    let lines = [
        (
            format!("By: {}", state.sort_by.label()),
            state.focus == Focus::SortColumn,
        ),
        (format!("Order: {order}"), state.focus == Focus::SortOrder),
    ];
    render_option_lines(frame, inner, &lines);
}

fn render_option_lines(frame: &mut Frame, inner: Rect, lines: &[(String, bool)]) {
    for (i, (text, focused)) in lines.iter().enumerate() {
        if i as u16 >= inner.height {
            break;
        }
        let row_area = Rect {
            x: inner.x,
            y: inner.y + i as u16,
            width: inner.width,
            height: 1,
        };
        let style = if *focused {
            Style::default().fg(Color::White).bg(Color::DarkGray)
        } else {
            Style::default()
        };
        frame.render_widget(Paragraph::new(text.as_str()).style(style), row_area);
    }
}

fn render_console(frame: &mut Frame, area: Rect, state: &AppState) {
    let text = if state.logs.is_empty() {
        "No messages yet".to_string()
    } else {
        state
            .logs
            .iter()
            .rev()
            .take(3)
            .cloned()
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n")
    };
    let console = Paragraph::new(text).block(Block::default().title("Console").borders(Borders::ALL));
    frame.render_widget(console, area);
}

fn render_dashboard(frame: &mut Frame, area: Rect, state: &AppState, view: &MatchupView) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Length(9),
            Constraint::Min(6),
            Constraint::Length(9),
        ])
        .split(area);

    let sel = state.selection();
    render_metrics(frame, chunks[0], &sel.team1, &sel.team2, view);
    render_chart_row(frame, chunks[1], &sel.team1, &sel.team2, view);
    render_combined_table(frame, chunks[2], state, view);
    render_top_performers(frame, chunks[3], &sel.team1, &sel.team2, view);
}

fn render_metrics(frame: &mut Frame, area: Rect, team1: &str, team2: &str, view: &MatchupView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(33),
            Constraint::Percentage(33),
            Constraint::Percentage(34),
        ])
        .split(area);

    let t1 = Paragraph::new(format!("{:.2}", view.team1_impact)).block(
        Block::default()
            .title(format!("{} Total Impact", label_or_dash(team1)))
            .borders(Borders::ALL),
    );
    frame.render_widget(t1, cols[0]);

    let t2 = Paragraph::new(format!("{:.2}", view.team2_impact)).block(
        Block::default()
            .title(format!("{} Total Impact", label_or_dash(team2)))
            .borders(Borders::ALL),
    );
    frame.render_widget(t2, cols[1]);

    let direction = if view.advantage >= 0.0 {
        format!("{} by {:.2}", label_or_dash(team1), view.advantage.abs())
    } else {
        format!("{} by {:.2}", label_or_dash(team2), view.advantage.abs())
    };
    let adv = Paragraph::new(format!("{:+.2}\n{direction}", view.advantage)).block(
        Block::default()
            .title("Projected Advantage")
            .borders(Borders::ALL),
    );
    frame.render_widget(adv, cols[2]);
}

fn render_chart_row(frame: &mut Frame, area: Rect, team1: &str, team2: &str, view: &MatchupView) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(24), Constraint::Length(36)])
        .split(area);

    render_impact_bars(frame, cols[0], team1, team2, view);
    render_prediction(frame, cols[1], team1, team2, &view.call);
}

fn render_impact_bars(frame: &mut Frame, area: Rect, team1: &str, team2: &str, view: &MatchupView) {
    let block = Block::default().title("Team Impact").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }

    // Bars clamp at zero for negative totals; the exact signed value rides
    // on the bar text.
    let bars = [
        impact_bar(team1, view.team1_impact, Color::Green),
        impact_bar(team2, view.team2_impact, Color::Red),
    ];
    let chart = BarChart::default()
        .data(BarGroup::default().bars(&bars))
        .bar_width(9)
        .bar_gap(3);
    frame.render_widget(chart, inner);
}

fn impact_bar(team: &str, total: f64, color: Color) -> Bar<'static> {
    Bar::default()
        .value(total.max(0.0).round() as u64)
        .text_value(format!("{total:.2}"))
        .label(label_or_dash(team).to_string().into())
        .style(Style::default().fg(color))
}

fn render_prediction(frame: &mut Frame, area: Rect, team1: &str, team2: &str, call: &MatchupCall) {
    let (text, color) = match call {
        MatchupCall::TeamOneFavored(margin) => (
            format!("{} favored\nby {margin:.2} points", label_or_dash(team1)),
            Color::Green,
        ),
        MatchupCall::TeamTwoFavored(margin) => (
            format!("{} favored\nby {margin:.2} points", label_or_dash(team2)),
            Color::Red,
        ),
        MatchupCall::Close => ("Close matchup\nwithin 1 point".to_string(), Color::Blue),
    };
    let prediction = Paragraph::new(text)
        .style(Style::default().fg(color).add_modifier(Modifier::BOLD))
        .block(Block::default().title("Prediction").borders(Borders::ALL));
    frame.render_widget(prediction, area);
}

fn combined_columns() -> [Constraint; 6] {
    [
        Constraint::Length(5),
        Constraint::Min(18),
        Constraint::Length(4),
        Constraint::Length(6),
        Constraint::Length(6),
        Constraint::Length(8),
    ]
}

fn render_combined_table(frame: &mut Frame, area: Rect, state: &AppState, view: &MatchupView) {
    let block = Block::default()
        .title(format!("Player Contributions ({})", view.combined.len()))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height < 2 {
        return;
    }

    let widths = combined_columns();
    let header_area = Rect { height: 1, ..inner };
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(header_area);
    let bold = Style::default().add_modifier(Modifier::BOLD);
    render_cell_text(frame, cols[0], "Team", bold);
    render_cell_text(frame, cols[1], "Player", bold);
    render_cell_text(frame, cols[2], "G", bold);
    render_cell_text(frame, cols[3], "MPG", bold);
    render_cell_text(frame, cols[4], "BPM", bold);
    render_cell_text(frame, cols[5], "Impact", bold);

    if view.combined.is_empty() {
        let empty_area = Rect {
            y: inner.y + 1,
            height: 1,
            ..inner
        };
        let empty = Paragraph::new("No qualifying players for this matchup")
            .style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, empty_area);
        return;
    }

    let visible = (inner.height - 1) as usize;
    let total = view.combined.len();
    let start = state.combined_scroll.min(total.saturating_sub(visible));
    let end = (start + visible).min(total);

    for (i, row) in view.combined[start..end].iter().enumerate() {
        let row_area = Rect {
            x: inner.x,
            y: inner.y + 1 + i as u16,
            width: inner.width,
            height: 1,
        };
        render_player_row(frame, row_area, row, &widths);
    }
}

fn render_player_row(frame: &mut Frame, area: Rect, row: &PlayerRow, widths: &[Constraint]) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints(widths)
        .split(area);

    let impact_style = if row.impact < 0.0 {
        Style::default().fg(Color::Red)
    } else {
        Style::default()
    };
    render_cell_text(frame, cols[0], &row.team, Style::default());
    render_cell_text(frame, cols[1], &row.player, Style::default());
    render_cell_text(frame, cols[2], &row.games.to_string(), Style::default());
    render_cell_text(frame, cols[3], &format!("{:.1}", row.mpg), Style::default());
    render_cell_text(frame, cols[4], &format!("{:.1}", row.bpm), Style::default());
    render_cell_text(frame, cols[5], &format!("{:.3}", row.impact), impact_style);
}

fn render_cell_text(frame: &mut Frame, area: Rect, text: &str, style: Style) {
    let paragraph = Paragraph::new(text).style(style);
    frame.render_widget(paragraph, area);
}

fn render_top_performers(
    frame: &mut Frame,
    area: Rect,
    team1: &str,
    team2: &str,
    view: &MatchupView,
) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_top_list(frame, cols[0], label_or_dash(team1), &view.top_team1);
    render_top_list(frame, cols[1], label_or_dash(team2), &view.top_team2);
}

fn render_top_list(frame: &mut Frame, area: Rect, team: &str, top: &[TopPerformer]) {
    let block = Block::default()
        .title(format!("{team} Top 5"))
        .borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if top.is_empty() {
        let empty =
            Paragraph::new("No qualifying players").style(Style::default().fg(Color::DarkGray));
        frame.render_widget(empty, inner);
        return;
    }

    let lines: Vec<String> = top
        .iter()
        .map(|p| format!("{:<24} {:>8.3}", p.player, p.impact))
        .collect();
    frame.render_widget(Paragraph::new(lines.join("\n")), inner);
}

fn render_load_error(frame: &mut Frame, area: Rect, err: &str) {
    let text = format!(
        "Could not load NBA data.\n\n{err}\n\nPress r to retry, q to quit."
    );
    let msg = Paragraph::new(text)
        .style(Style::default().fg(Color::Red))
        .block(Block::default().title("Load Error").borders(Borders::ALL));
    frame.render_widget(msg, centered_rect(60, 40, area));
}

fn visible_range(selected: usize, total: usize, visible: usize) -> (usize, usize) {
    if total == 0 || visible == 0 {
        return (0, 0);
    }
    if total <= visible {
        return (0, total);
    }

    let mut start = selected.saturating_sub(visible / 2);
    if start + visible > total {
        start = total - visible;
    }
    (start, start + visible)
}

fn render_help_overlay(frame: &mut Frame, area: Rect) {
    let popup_area = centered_rect(60, 60, area);
    frame.render_widget(Clear, popup_area);

    let text = [
        "NBA BPM Impact Terminal - Help",
        "",
        "Global:",
        "  Tab / Shift-Tab   Cycle control focus",
        "  j/k or ↑/↓        Move cursor / adjust control",
        "  ←/→               Adjust min-games slider",
        "  Space / Enter     Toggle injured (player list)",
        "  c                 Clear all injuries",
        "  s                 Cycle sort column",
        "  o                 Toggle sort order",
        "  PgUp / PgDn       Scroll player table",
        "  r                 Refresh data (bypasses cache)",
        "  ?                 Toggle help",
        "  q                 Quit",
        "",
        "Impact = (BPM / 100) x MPG x 2.083",
        "Injured players count as zero impact.",
    ]
    .join("\n");

    let help = Paragraph::new(text)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .style(Style::default());
    frame.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1]);

    horizontal[1]
}
