//! Layout resolution: which template a slide uses and how its text is styled.

use crate::diagnostic::{Diagnostic, DiagnosticKind};
use crate::sink::{Alignment, DocumentSink, RegionId, RegionInfo, RegionRole, SlideId, SlideTemplate, TextStyle};
use crate::tabular::format_bullets;
use crate::types::{Config, LayoutKind, Slide, Theme};
use crate::Result;
use std::ops::Range;

/// Background used when a theme does not override it.
pub const DEFAULT_BACKGROUND: &str = "#FFFFFF";

/// Text color used by the default theme.
pub const DEFAULT_TEXT_COLOR: &str = "#000000";

/// Resolve the theme for a section.
///
/// Every section currently shares the black-on-white default.
pub fn theme_for_section(_section_id: &str, _config: &Config) -> Theme {
    Theme {
        background_color: DEFAULT_BACKGROUND.to_string(),
        text_color: DEFAULT_TEXT_COLOR.to_string(),
    }
}

/// Font and color settings resolved from a [`Config`], with defaults applied.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleSheet {
    pub title_slide_font_size: f64,
    pub section_slide_font_size: f64,
    pub content_title_font_size: f64,
    pub subtitle_font_size: f64,
    pub bullet_font_size: f64,
    /// Notes are only styled when this is configured.
    pub speaker_notes_font_size: Option<f64>,
    pub header_font: String,
    pub body_font: String,
    pub text_color: String,
}

impl StyleSheet {
    /// Read every styling key, falling back to the default table.
    pub fn from_config(config: &Config) -> Self {
        Self {
            title_slide_font_size: config.number_or("title_slide_font_size", 44.0),
            section_slide_font_size: config.number_or("section_slide_font_size", 40.0),
            content_title_font_size: config.number_or("content_title_font_size", 36.0),
            subtitle_font_size: config.number_or("subtitle_font_size", 24.0),
            bullet_font_size: config.number_or("bullet_font_size", 20.0),
            speaker_notes_font_size: config
                .number("speaker_notes_font_size")
                .filter(|n| *n != 0.0),
            header_font: config.text_or("header_font", "Arial"),
            body_font: config.text_or("body_font", "Arial"),
            text_color: config.text_or("text_color", DEFAULT_TEXT_COLOR),
        }
    }
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::from_config(&Config::from_pairs(Vec::<(String, String)>::new()))
    }
}

/// Compose body text: subtitle and a blank line (if any subtitle), then bullets.
pub fn compose_body(subtitle: &str, bullets: &str) -> String {
    let mut body = String::new();
    if !subtitle.is_empty() {
        body.push_str(subtitle);
        body.push_str("\n\n");
    }
    if !bullets.is_empty() {
        body.push_str(&format_bullets(bullets));
    }
    body
}

/// Template each layout kind is built from.
pub fn template_for(kind: LayoutKind) -> SlideTemplate {
    match kind {
        LayoutKind::Title => SlideTemplate::Title,
        LayoutKind::Section | LayoutKind::Content => SlideTemplate::TitleAndBody,
    }
}

/// Create `slide` in the sink and fill its regions for its layout kind.
///
/// Errors creating the slide or writing its text are returned; styling
/// failures are collected in the diagnostics list.
pub fn render_slide<S: DocumentSink + ?Sized>(
    sink: &mut S,
    slide: &Slide,
    styles: &StyleSheet,
    theme: &Theme,
) -> Result<(SlideId, Vec<Diagnostic>)> {
    let kind = slide.layout_kind();
    let id = sink.create_slide(template_for(kind))?;
    let regions = sink.regions(id)?;
    let mut diagnostics = Vec::new();

    let mut ctx = RegionWriter {
        sink,
        slide: id,
        diagnostics: &mut diagnostics,
    };

    match kind {
        LayoutKind::Title => fill_title(&mut ctx, &regions, slide, styles)?,
        LayoutKind::Section => fill_section(&mut ctx, &regions, slide, styles, theme)?,
        LayoutKind::Content => fill_content(&mut ctx, &regions, slide, styles, theme)?,
    }

    Ok((id, diagnostics))
}

/// First region tagged with any of `roles`. Untagged regions are skipped.
pub fn find_region(regions: &[RegionInfo], roles: &[RegionRole]) -> Option<RegionId> {
    regions
        .iter()
        .find(|r| r.role.is_some_and(|role| roles.contains(&role)))
        .map(|r| r.id)
}

struct RegionWriter<'a, S: DocumentSink + ?Sized> {
    sink: &'a mut S,
    slide: SlideId,
    diagnostics: &'a mut Vec<Diagnostic>,
}

impl<S: DocumentSink + ?Sized> RegionWriter<'_, S> {
    fn text(&mut self, region: RegionId, text: &str) -> Result<()> {
        self.sink.set_text(self.slide, region, text)
    }

    fn style(&mut self, region: RegionId, range: Option<Range<usize>>, style: &TextStyle, what: &str) {
        if let Err(e) = self.sink.style_text(self.slide, region, range, style) {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::Style,
                format!("Could not style {}: {}", what, e),
            ));
        }
    }

    fn align(&mut self, region: RegionId, alignment: Alignment, what: &str) {
        if let Err(e) = self.sink.set_alignment(self.slide, region, alignment) {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::Style,
                format!("Could not align {}: {}", what, e),
            ));
        }
    }

    fn background(&mut self, color: &str) {
        if let Err(e) = self.sink.set_background(self.slide, color) {
            self.diagnostics.push(Diagnostic::new(
                DiagnosticKind::Background,
                format!("Could not set background: {}", e),
            ));
        }
    }

    /// Write the composed body and restyle its subtitle prefix.
    fn body(
        &mut self,
        region: RegionId,
        slide: &Slide,
        base: &TextStyle,
        alignment: Alignment,
        subtitle_size: f64,
    ) -> Result<()> {
        let body = compose_body(&slide.subtitle, &slide.bullets);
        if body.trim().is_empty() {
            return Ok(());
        }

        self.text(region, &body)?;
        self.style(region, None, base, "body");
        self.align(region, alignment, "body");

        if !slide.subtitle.is_empty() {
            let subtitle = TextStyle::new().size(subtitle_size).italic(true);
            self.style(
                region,
                Some(0..slide.subtitle.chars().count()),
                &subtitle,
                "subtitle range",
            );
        }
        Ok(())
    }
}

fn fill_title<S: DocumentSink + ?Sized>(
    ctx: &mut RegionWriter<'_, S>,
    regions: &[RegionInfo],
    slide: &Slide,
    styles: &StyleSheet,
) -> Result<()> {
    if let Some(region) = find_region(regions, &[RegionRole::CenteredTitle, RegionRole::Title]) {
        if !slide.title.is_empty() {
            ctx.text(region, &slide.title)?;
            let style = TextStyle::new()
                .size(styles.title_slide_font_size)
                .family(&styles.header_font)
                .color(&styles.text_color)
                .bold(true);
            ctx.style(region, None, &style, "title");
        }
    }

    if let Some(region) = find_region(regions, &[RegionRole::Subtitle]) {
        if !slide.subtitle.is_empty() {
            ctx.text(region, &slide.subtitle)?;
            let style = TextStyle::new()
                .size(styles.subtitle_font_size)
                .family(&styles.body_font)
                .color(&styles.text_color);
            ctx.style(region, None, &style, "subtitle");
        }
    }
    Ok(())
}

fn fill_section<S: DocumentSink + ?Sized>(
    ctx: &mut RegionWriter<'_, S>,
    regions: &[RegionInfo],
    slide: &Slide,
    styles: &StyleSheet,
    theme: &Theme,
) -> Result<()> {
    if let Some(region) = find_region(regions, &[RegionRole::Title]) {
        if !slide.title.is_empty() {
            ctx.text(region, &slide.title)?;
            let style = TextStyle::new()
                .size(styles.section_slide_font_size)
                .family(&styles.header_font)
                .color(&theme.text_color)
                .bold(true);
            ctx.style(region, None, &style, "section title");
            ctx.align(region, Alignment::Center, "section title");
        }
    }

    if let Some(region) = find_region(regions, &[RegionRole::Body]) {
        let base = TextStyle::new()
            .size(styles.subtitle_font_size)
            .family(&styles.body_font)
            .color(&theme.text_color);
        ctx.body(region, slide, &base, Alignment::Center, styles.subtitle_font_size)?;
    }
    Ok(())
}

fn fill_content<S: DocumentSink + ?Sized>(
    ctx: &mut RegionWriter<'_, S>,
    regions: &[RegionInfo],
    slide: &Slide,
    styles: &StyleSheet,
    theme: &Theme,
) -> Result<()> {
    if !theme.background_color.eq_ignore_ascii_case(DEFAULT_BACKGROUND) {
        ctx.background(&theme.background_color);
    }

    if let Some(region) = find_region(regions, &[RegionRole::Title]) {
        if !slide.title.is_empty() {
            ctx.text(region, &slide.title)?;
            let style = TextStyle::new()
                .size(styles.content_title_font_size)
                .family(&styles.header_font)
                .color(&theme.text_color)
                .bold(true);
            ctx.style(region, None, &style, "title");
        }
    }

    if let Some(region) = find_region(regions, &[RegionRole::Body]) {
        let base = TextStyle::new()
            .size(styles.bullet_font_size)
            .family(&styles.body_font)
            .color(&theme.text_color);
        ctx.body(region, slide, &base, Alignment::Left, styles.subtitle_font_size)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::deck::Deck;
    use crate::types::ConfigValue;

    #[test]
    fn test_theme_is_constant() {
        let config = Config::from_pairs([("text_color", "#FF0000")]);
        let theme = theme_for_section("intro", &config);
        assert_eq!(theme, theme_for_section("", &Config::new()));
        assert_eq!(theme.background_color, "#FFFFFF");
        assert_eq!(theme.text_color, "#000000");
    }

    #[test]
    fn test_style_sheet_defaults_and_overrides() {
        let config = Config::from_pairs([
            ("bullet_font_size", ConfigValue::Number(18.0)),
            ("header_font", ConfigValue::from("Georgia")),
            ("speaker_notes_font_size", ConfigValue::Number(12.0)),
        ]);
        let styles = StyleSheet::from_config(&config);
        assert_eq!(styles.bullet_font_size, 18.0);
        assert_eq!(styles.header_font, "Georgia");
        assert_eq!(styles.title_slide_font_size, 44.0);
        assert_eq!(styles.speaker_notes_font_size, Some(12.0));
        assert_eq!(StyleSheet::default().speaker_notes_font_size, None);
    }

    #[test]
    fn test_compose_body() {
        assert_eq!(compose_body("Sub", "a|b"), "Sub\n\n• a\n• b");
        assert_eq!(compose_body("", "a|b"), "• a\n• b");
        assert_eq!(compose_body("Sub", ""), "Sub\n\n");
        assert_eq!(compose_body("", ""), "");
    }

    #[test]
    fn test_find_region_skips_untagged() {
        let regions = vec![
            RegionInfo {
                id: RegionId(0),
                role: None,
            },
            RegionInfo {
                id: RegionId(1),
                role: Some(RegionRole::Body),
            },
            RegionInfo {
                id: RegionId(2),
                role: Some(RegionRole::Title),
            },
        ];
        assert_eq!(find_region(&regions, &[RegionRole::Title]), Some(RegionId(2)));
        assert_eq!(find_region(&regions, &[RegionRole::Subtitle]), None);
    }

    #[test]
    fn test_title_slide_regions() {
        let mut deck = Deck::default();
        let slide = Slide::new(1.0, "Welcome")
            .with_layout("Title")
            .with_subtitle("Kickoff");
        let styles = StyleSheet::default();
        let theme = theme_for_section("", &Config::new());

        let (id, diagnostics) = render_slide(&mut deck, &slide, &styles, &theme).unwrap();
        assert!(diagnostics.is_empty());

        let rendered = deck.slide(id).unwrap();
        let title = rendered.region(RegionRole::CenteredTitle).unwrap();
        assert_eq!(title.body.text, "Welcome");
        let style = title.body.leading_style();
        assert_eq!(style.font_size, Some(44.0));
        assert_eq!(style.bold, Some(true));
        assert_eq!(
            rendered.region(RegionRole::Subtitle).unwrap().body.text,
            "Kickoff"
        );
    }

    #[test]
    fn test_section_slide_centered_with_italic_subtitle() {
        let mut deck = Deck::default();
        let slide = Slide::new(1.0, "Part One")
            .with_layout("Section")
            .with_subtitle("Basics")
            .with_bullets("x • y");
        let styles = StyleSheet::default();
        let theme = theme_for_section("", &Config::new());

        let (id, _) = render_slide(&mut deck, &slide, &styles, &theme).unwrap();
        let rendered = deck.slide(id).unwrap();

        let title = rendered.region(RegionRole::Title).unwrap();
        assert_eq!(title.body.alignment, Some(Alignment::Center));
        assert_eq!(title.body.leading_style().font_size, Some(40.0));

        let body = rendered.region(RegionRole::Body).unwrap();
        assert_eq!(body.body.text, "Basics\n\n• x\n• y");
        assert_eq!(body.body.alignment, Some(Alignment::Center));
        let paragraphs = body.body.paragraphs();
        assert_eq!(paragraphs[0][0].style.italic, Some(true));
        assert_eq!(paragraphs[0][0].style.font_size, Some(24.0));
        assert_eq!(paragraphs[2][0].style.italic, None);
    }

    #[test]
    fn test_content_slide_left_aligned_bullets() {
        let mut deck = Deck::default();
        let slide = Slide::new(2.0, "Agenda")
            .with_layout("Content")
            .with_subtitle("Today")
            .with_bullets("a|b");
        let styles = StyleSheet::default();
        let theme = theme_for_section("", &Config::new());

        let (id, _) = render_slide(&mut deck, &slide, &styles, &theme).unwrap();
        let rendered = deck.slide(id).unwrap();
        let body = rendered.region(RegionRole::Body).unwrap();

        assert_eq!(body.body.alignment, Some(Alignment::Left));
        let paragraphs = body.body.paragraphs();
        assert_eq!(paragraphs[0][0].style.font_size, Some(24.0));
        assert_eq!(paragraphs[2][0].text, "• a");
        assert_eq!(paragraphs[2][0].style.font_size, Some(20.0));
        assert!(rendered.background.is_none());
    }

    #[test]
    fn test_bad_color_is_cosmetic() {
        let mut deck = Deck::default();
        let slide = Slide::new(1.0, "Hello").with_layout("Title");
        let config = Config::from_pairs([("text_color", "blue")]);
        let styles = StyleSheet::from_config(&config);
        let theme = theme_for_section("", &config);

        let (id, diagnostics) = render_slide(&mut deck, &slide, &styles, &theme).unwrap();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Style);
        let title = deck.slide(id).unwrap().region(RegionRole::CenteredTitle).unwrap();
        assert_eq!(title.body.text, "Hello");
    }
}
