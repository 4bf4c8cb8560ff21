use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};
use socratic_core::ChatRole;
use crate::app::App;

const EXAMPLE_PROMPTS: [&str; 3] = [
    "Why are plants green?",
    "How does gradient descent work?",
    "What is overfitting in ML?",
];

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let error_height = if app.coordinator.last_error().is_some() { 3 } else { 0 };

    // Header, transcript, error banner, input, status line
    let [header_area, chat_area, error_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(0),
        Constraint::Length(error_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if error_height > 0 {
        render_error(app, frame, error_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Socratic Tutor ", Style::default().fg(Color::Cyan).bold()),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);
    let subtitle = Line::from(vec![
        Span::styled(" Guided Q&A powered by GPT.", Style::default().fg(Color::Gray)),
        Span::styled(format!("  {}", app.api_url), Style::default().fg(Color::DarkGray)),
    ]);

    let header = Paragraph::new(vec![title, subtitle]).style(Style::default().bg(Color::Black));
    frame.render_widget(header, area);
}

fn chat_lines(app: &App) -> Text<'static> {
    if app.messages().is_empty() && !app.is_pending() {
        let mut lines = vec![Line::from(Span::styled(
            "Ask me something to begin:",
            Style::default().fg(Color::Gray),
        ))];
        for prompt in EXAMPLE_PROMPTS {
            lines.push(Line::from(Span::styled(
                format!("  • “{}”", prompt),
                Style::default().fg(Color::DarkGray),
            )));
        }
        return Text::from(lines);
    }

    let mut lines: Vec<Line> = Vec::new();

    for msg in app.messages() {
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
            ChatRole::Assistant => {
                lines.push(Line::from(Span::styled(
                    "Tutor:",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
                for line in msg.content.lines() {
                    lines.push(Line::from(line.to_string()));
                }
            }
        }
        if let Some(meta) = &msg.meta {
            lines.push(Line::from(Span::styled(
                meta.summary(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        lines.push(Line::default());
    }

    if app.is_pending() {
        lines.push(Line::from(Span::styled(
            "Tutor:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    Text::from(lines)
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area for mouse hit-testing and its inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let chat = Paragraph::new(chat_lines(app)).wrap(Wrap { trim: true });
    app.transcript_height = u16::try_from(chat.line_count(app.chat_width)).unwrap_or(u16::MAX);

    // Pane size is only final here, after the error banner took its rows
    if app.follow_bottom {
        app.chat_scroll = app.max_scroll();
        app.follow_bottom = false;
    } else {
        app.chat_scroll = app.chat_scroll.min(app.max_scroll());
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(" Conversation ");

    frame.render_widget(chat.block(block).scroll((app.chat_scroll, 0)), area);

    if app.transcript_height > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(None)
            .end_symbol(None);
        let mut scrollbar_state = ScrollbarState::new(app.max_scroll() as usize)
            .position(app.chat_scroll as usize);
        frame.render_stateful_widget(scrollbar, area, &mut scrollbar_state);
    }
}

fn render_error(app: &App, frame: &mut Frame, area: Rect) {
    let Some(error) = app.coordinator.last_error() else {
        return;
    };

    let banner = Paragraph::new(error.to_string())
        .style(Style::default().fg(Color::Red))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red))
                .title(" Error "),
        )
        .wrap(Wrap { trim: true });
    frame.render_widget(banner, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.is_pending();

    let (border_color, title) = if pending {
        (Color::DarkGray, " Waiting for the tutor... ")
    } else {
        (Color::Yellow, " Ask a thoughtful question... ")
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let text_style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };

    let input = Paragraph::new(visible_text)
        .style(text_style)
        .block(input_block);

    frame.render_widget(input, area);

    // Cursor only while the input is live
    if !pending {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.is_pending();

    let (status_text, status_style) = if pending {
        (" Backend: Thinking... ", Style::default().bg(Color::Yellow).fg(Color::Black))
    } else {
        (" Backend: Ready ", Style::default().bg(Color::Blue).fg(Color::White))
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let send_style = if app.can_send() { label_style } else { disabled_style };
    let reset_style = if pending { disabled_style } else { label_style };

    let spans = vec![
        Span::styled(status_text, status_style),
        Span::styled(
            format!(" Tokens used: {} ", app.coordinator.total_tokens()),
            label_style,
        ),
        Span::styled(" Enter ", key_style),
        Span::styled(" send ", send_style),
        Span::styled(" ^R ", key_style),
        Span::styled(" reset ", reset_style),
        Span::styled(" PgUp/PgDn ", key_style),
        Span::styled(" scroll ", label_style),
        Span::styled(" Esc ", key_style),
        Span::styled(" quit ", label_style),
    ];

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
