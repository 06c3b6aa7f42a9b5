use anyhow::Result;
use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};
// Use Popup from tui-widgets to render the form dialog
use tui_widgets::popup::Popup;

use crate::config::RgbColor;
use crate::phone;

use super::app::App;
use super::form::{EditContactForm, FieldRole, Focus};

const LIST_HELP: &str = "j/k: nav  e/Enter: edit contact  q: quit";
const FORM_HELP: &str = "Tab: field  Space: toggle  Enter/F2: save  Esc: cancel";
const PHONE_HIDDEN: &str = "phone number hidden";

const FIELD_LABEL_WIDTH: usize = 12;

pub fn render<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    terminal.draw(|frame| draw_frame(frame, app))?;
    Ok(())
}

fn draw_frame(frame: &mut Frame<'_>, app: &mut App) {
    let size = frame.area();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);

    draw_header(frame, layout[0], app);
    draw_list(frame, layout[1], app);
    draw_footer(frame, layout[2], app);
    draw_form(frame, size, app);
    draw_notice(frame, size, app);
}

fn draw_header(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let line = Line::from(vec![
        Span::styled("PEERBOOK", header_text_style(app).add_modifier(Modifier::BOLD)),
        Span::raw("  "),
        Span::styled(app.server_label().to_string(), header_text_style(app)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn draw_list(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(border_style(app))
        .title(Span::styled(" CONTACTS ", header_text_style(app)));

    if app.contacts().is_empty() {
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(
            Paragraph::new("No contacts").style(header_text_style(app)),
            inner,
        );
        return;
    }

    let items: Vec<ListItem> = app
        .contacts()
        .iter()
        .map(|contact| {
            let name_style = if contact.is_contact {
                Style::default()
            } else {
                header_text_style(app)
            };
            let shown_phone = phone::format_display(&contact.phone, app.phone_region());
            let mut spans = vec![Span::styled(contact.display_name(), name_style)];
            if !shown_phone.is_empty() {
                spans.push(Span::raw("  "));
                spans.push(Span::styled(shown_phone, header_text_style(app)));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(selection_style(app));

    let mut state = ListState::default();
    state.select(Some(app.selected));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_footer(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let message: String = if app.form.is_some() {
        FORM_HELP.to_string()
    } else {
        app.status.clone().unwrap_or_else(|| LIST_HELP.to_string())
    };

    let colors = app.ui_colors();
    let style = Style::default()
        .fg(color(colors.status_fg))
        .bg(color(colors.status_bg));

    let background = Block::default().style(Style::default().bg(color(colors.status_bg)));
    frame.render_widget(background, area);
    frame.render_widget(Paragraph::new(message).style(style), area);
}

fn draw_form(frame: &mut Frame<'_>, area: Rect, app: &mut App) {
    let Some(form) = app.form.as_ref() else {
        return;
    };

    let contact_name = app
        .contacts()
        .iter()
        .find(|c| c.id == form.contact_id())
        .map(|c| c.display_name())
        .unwrap_or_default();

    let phone_line = if form.phone().is_empty() {
        Line::from(Span::styled(PHONE_HIDDEN.to_string(), header_text_style(app)))
    } else {
        Line::from(Span::raw(phone::format_display(
            form.phone(),
            app.phone_region(),
        )))
    };

    let mut lines = vec![
        Line::from(Span::styled(
            contact_name,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        phone_line,
        Line::from(""),
    ];

    // Name fields in visual order; cursor position tracked for the
    // focused one.
    let mut cursor: Option<(u16, u16)> = None;
    for role in form.order() {
        if form.focus() == Focus::Field(role) {
            cursor = Some((
                (FIELD_LABEL_WIDTH + form.input(role).visual_cursor()) as u16,
                lines.len() as u16,
            ));
        }
        lines.push(field_line(app, form, role));
    }

    if let Some(warning) = form.warning() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            warning.to_string(),
            header_text_style(app),
        )));
    }

    if let Some(checked) = form.share_phone() {
        let marker = if checked { "[x]" } else { "[ ]" };
        let style = if form.focus() == Focus::SharePhone {
            selection_style(app)
        } else {
            Style::default()
        };
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{marker} Share my phone number"),
            style,
        )));
        if let Some(note) = form.share_note() {
            lines.push(Line::from(Span::styled(
                note.to_string(),
                header_text_style(app),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        FORM_HELP.to_string(),
        header_text_style(app),
    )));

    let title_line = Line::from(Span::styled(form.title(), header_text_style(app)));
    let popup = Popup::new(Text::from(lines))
        .title(title_line)
        .border_style(border_style(app));

    frame.render_stateful_widget_ref(popup, area, &mut app.modal_popup);

    if let Some(popup_area) = app.modal_popup.area() {
        let inner = Block::default().borders(Borders::ALL).inner(*popup_area);
        if let Some((x, y)) = cursor {
            frame.set_cursor_position((
                inner.x.saturating_add(x),
                inner.y.saturating_add(y),
            ));
        }
    }
}

fn field_line(app: &App, form: &EditContactForm, role: FieldRole) -> Line<'static> {
    let focused = form.focus() == Focus::Field(role);
    let erroneous = form.error() == Some(role);

    let label = format!(
        "{:width$}",
        format!("{}:", EditContactForm::label(role)),
        width = FIELD_LABEL_WIDTH
    );
    let label_style = if erroneous {
        error_style(app)
    } else if focused {
        selection_style(app)
    } else {
        header_text_style(app)
    };
    let value_style = if erroneous {
        error_style(app)
    } else if focused {
        selection_style(app)
    } else {
        Style::default()
    };

    Line::from(vec![
        Span::styled(label, label_style),
        Span::styled(form.input(role).value().to_string(), value_style),
    ])
}

fn draw_notice(frame: &mut Frame<'_>, area: Rect, app: &App) {
    let Some(notice) = app.notice.as_ref() else {
        return;
    };

    let text = format!(" {} ", notice.message);
    let width = (text.len() as u16 + 2).min(area.width);
    let height = 3u16.min(area.height);
    let x = area.x + area.width.saturating_sub(width + 1);
    let y = area.y + 1;
    let notice_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, notice_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(notice_style(app));
    let inner = block.inner(notice_area);
    frame.render_widget(block, notice_area);
    frame.render_widget(Paragraph::new(text).style(notice_style(app)), inner);
}

fn color(rgb: RgbColor) -> Color {
    Color::Rgb(rgb.r, rgb.g, rgb.b)
}

fn selection_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default()
        .fg(color(colors.selection_fg))
        .bg(color(colors.selection_bg))
}

fn border_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.border))
}

fn header_text_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.separator))
}

fn error_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.error))
}

fn notice_style(app: &App) -> Style {
    let colors = app.ui_colors();
    Style::default().fg(color(colors.notice))
}
