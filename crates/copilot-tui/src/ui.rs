use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Wrap},
};
use copilot_core::{is_emergency_turn, ChatRole};
use crate::app::App;

/// Most input rows shown before the box starts scrolling
const MAX_INPUT_ROWS: u16 = 4;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str, base: Style) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut chars = text.chars().peekable();
    let mut current_text = String::new();

    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'*') {
            chars.next();

            if !current_text.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut current_text), base));
            }

            // Find closing **
            let mut bold_text = String::new();
            let mut found_close = false;

            while let Some(c) = chars.next() {
                if c == '*' && chars.peek() == Some(&'*') {
                    chars.next();
                    found_close = true;
                    break;
                }
                bold_text.push(c);
            }

            if found_close && !bold_text.is_empty() {
                spans.push(Span::styled(bold_text, base.add_modifier(Modifier::BOLD)));
            } else {
                // No closing **, treat as literal
                current_text.push_str("**");
                current_text.push_str(&bold_text);
            }
        } else {
            current_text.push(c);
        }
    }

    if !current_text.is_empty() {
        spans.push(Span::styled(current_text, base));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let input_rows = (app.session.input().matches('\n').count() as u16 + 1).min(MAX_INPUT_ROWS);

    // Main layout: header, messages, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);
    render_messages(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(frame: &mut Frame, area: Rect) {
    let [title_area, action_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(24),
    ])
    .areas(area);

    let title = Line::from(vec![
        Span::styled(" Clinical Co-pilot ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("IMCI guideline support ", Style::default().fg(Color::White)),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);
    frame.render_widget(
        Paragraph::new(title).style(Style::default().bg(Color::DarkGray)),
        title_area,
    );

    let action = Line::from(vec![
        Span::styled(" ^L ", Style::default().bg(Color::Black).fg(Color::White)),
        Span::styled(" Clear Chat ", Style::default().bg(Color::Red).fg(Color::White).bold()),
    ])
    .right_aligned();
    frame.render_widget(
        Paragraph::new(action).style(Style::default().bg(Color::DarkGray)),
        action_area,
    );
}

fn render_messages(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Consultation ");

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.session.messages() {
        match msg.role {
            ChatRole::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
            ChatRole::Assistant if is_emergency_turn(msg) => {
                lines.push(Line::from(vec![
                    Span::styled(
                        "Co-pilot:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ),
                    Span::raw(" "),
                    Span::styled(
                        " EMERGENCY ",
                        Style::default().bg(Color::Red).fg(Color::White).add_modifier(Modifier::BOLD),
                    ),
                ]));
                let style = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line, style));
                }
            }
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Co-pilot:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(parse_markdown_line(line, Style::default()));
                }
            }
        }
        lines.push(Line::default());
    }

    if app.is_busy() {
        lines.push(Line::from(Span::styled(
            "Co-pilot:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    // Count wrapped rows before the border is attached
    app.chat_lines = u16::try_from(chat.line_count(inner_width)).unwrap_or(u16::MAX);
    app.chat_scroll = app.chat_scroll.min(app.max_scroll());

    let chat = chat.block(block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

/// Row and column of the cursor within multi-line input
fn cursor_row_col(input: &str, cursor: usize) -> (usize, usize) {
    let mut row = 0;
    let mut col = 0;
    for c in input.chars().take(cursor) {
        if c == '\n' {
            row += 1;
            col = 0;
        } else {
            col += 1;
        }
    }
    (row, col)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let busy = app.is_busy();
    let can_send = app.session.can_submit();

    let border_color = if busy { Color::DarkGray } else { Color::Yellow };
    let send_style = if can_send {
        Style::default().bg(Color::Green).fg(Color::Black).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = if busy {
        " Waiting for the co-pilot... "
    } else {
        " Describe the patient's symptoms "
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title)
        .title_bottom(Line::from(Span::styled(" Send ⏎ ", send_style)).right_aligned());

    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (row, col) = cursor_row_col(app.session.input(), app.input_cursor);

    // Keep the cursor row and column in view
    let row_offset = if inner_height > 0 && row >= inner_height { row + 1 - inner_height } else { 0 };
    let col_offset = if inner_width > 0 && col >= inner_width { col + 1 - inner_width } else { 0 };

    let input = Paragraph::new(app.session.input().to_string())
        .style(Style::default().fg(Color::Cyan))
        .block(block)
        .scroll((row_offset as u16, col_offset as u16));

    frame.render_widget(input, area);

    if !busy {
        frame.set_cursor_position((
            area.x + 1 + (col - col_offset) as u16,
            area.y + 1 + (row - row_offset) as u16,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let (mode_text, mode_style) = if app.is_busy() {
        (" BUSY ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" READY ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    let hints = [
        ("Enter", "send"),
        ("Shift+Enter", "newline"),
        ("PgUp/PgDn", "scroll"),
        ("^L", "clear"),
        ("Esc", "quit"),
    ];

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in hints {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
        spans.push(Span::raw(" "));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}
