//! Pre-flight checks on loaded slides and a short config summary.

use crate::types::{Config, Slide};
use std::fmt;

/// Issues listed before the summary collapses the rest into a count.
const MAX_LISTED_ISSUES: usize = 8;

/// A problem found on one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideIssue {
    /// 1-based position in the sorted slide list.
    pub index: usize,
    pub problem: SlideProblem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideProblem {
    MissingTitle,
    ChartWithoutReference,
    ImageWithoutReference,
}

impl fmt::Display for SlideIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let problem = match self.problem {
            SlideProblem::MissingTitle => "Missing title",
            SlideProblem::ChartWithoutReference => "Chart slide missing chart reference",
            SlideProblem::ImageWithoutReference => "Image slide missing media reference",
        };
        write!(f, "Slide {}: {}", self.index, problem)
    }
}

/// Result of validating a slide list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    pub slide_count: usize,
    pub issues: Vec<SlideIssue>,
}

impl ValidationReport {
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "All {} slides have required data!", self.slide_count);
        }

        writeln!(f, "Found {} issues:", self.issues.len())?;
        writeln!(f)?;
        let listed: Vec<String> = self
            .issues
            .iter()
            .take(MAX_LISTED_ISSUES)
            .map(ToString::to_string)
            .collect();
        write!(f, "{}", listed.join("\n"))?;

        if self.issues.len() > MAX_LISTED_ISSUES {
            write!(f, "\n\n...and {} more", self.issues.len() - MAX_LISTED_ISSUES)?;
        }
        Ok(())
    }
}

/// Check each slide for data its layout needs.
///
/// `Chart` and `Image` are not layouts the resolver knows, but authors use
/// them to mark slides whose media reference must be filled in.
pub fn validate_slides(slides: &[Slide]) -> ValidationReport {
    let mut issues = Vec::new();

    for (idx, slide) in slides.iter().enumerate() {
        let index = idx + 1;
        if slide.title.trim().is_empty() {
            issues.push(SlideIssue {
                index,
                problem: SlideProblem::MissingTitle,
            });
        }
        if slide.layout == "Chart" && slide.chart_ref.trim().is_empty() {
            issues.push(SlideIssue {
                index,
                problem: SlideProblem::ChartWithoutReference,
            });
        }
        if slide.layout == "Image" && slide.media_ref.trim().is_empty() {
            issues.push(SlideIssue {
                index,
                problem: SlideProblem::ImageWithoutReference,
            });
        }
    }

    ValidationReport {
        slide_count: slides.len(),
        issues,
    }
}

/// Headline settings of a loaded config.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSummary {
    pub deck_title: Option<String>,
    pub presenter_name: Option<String>,
    pub title_slide_font_size: Option<f64>,
    pub section_slide_font_size: Option<f64>,
    pub content_title_font_size: Option<f64>,
    pub total_settings: usize,
}

impl ConfigSummary {
    pub fn from_config(config: &Config) -> Self {
        Self {
            deck_title: config.deck_title(),
            presenter_name: config.text("presenter_name"),
            title_slide_font_size: config.number("title_slide_font_size"),
            section_slide_font_size: config.number("section_slide_font_size"),
            content_title_font_size: config.number("content_title_font_size"),
            total_settings: config.len(),
        }
    }
}

impl fmt::Display for ConfigSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn size(value: Option<f64>) -> String {
            value.map_or_else(|| "default".to_string(), |v| v.to_string())
        }

        writeln!(f, "Configuration loaded successfully!")?;
        writeln!(f)?;
        writeln!(f, "Title: {}", self.deck_title.as_deref().unwrap_or("Not set"))?;
        writeln!(
            f,
            "Presenter: {}",
            self.presenter_name.as_deref().unwrap_or("Not set")
        )?;
        writeln!(
            f,
            "Font sizes: Title={}, Section={}, Content={}",
            size(self.title_slide_font_size),
            size(self.section_slide_font_size),
            size(self.content_title_font_size)
        )?;
        write!(f, "Total settings: {}", self.total_settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ConfigValue;

    #[test]
    fn test_validate_flags_missing_references() {
        let slides = vec![
            Slide::new(1.0, "Intro"),
            Slide::new(2.0, "Growth").with_layout("Chart"),
            Slide::new(3.0, "Team").with_layout("Image").with_media_ref("team.png"),
            Slide::new(4.0, "Photo").with_layout("Image"),
        ];

        let report = validate_slides(&slides);
        assert!(!report.passed());
        assert_eq!(
            report.issues,
            vec![
                SlideIssue {
                    index: 2,
                    problem: SlideProblem::ChartWithoutReference
                },
                SlideIssue {
                    index: 4,
                    problem: SlideProblem::ImageWithoutReference
                },
            ]
        );
        assert!(report
            .to_string()
            .contains("Slide 2: Chart slide missing chart reference"));
    }

    #[test]
    fn test_summary_caps_listing() {
        let slides: Vec<Slide> = (1..=11)
            .map(|i| Slide::new(i as f64, format!("S{}", i)).with_layout("Chart"))
            .collect();

        let text = validate_slides(&slides).to_string();
        assert!(text.starts_with("Found 11 issues:"));
        assert!(text.contains("Slide 8:"));
        assert!(!text.contains("Slide 9:"));
        assert!(text.ends_with("...and 3 more"));
    }

    #[test]
    fn test_passing_report() {
        let report = validate_slides(&[Slide::new(1.0, "Only")]);
        assert!(report.passed());
        assert_eq!(report.to_string(), "All 1 slides have required data!");
    }

    #[test]
    fn test_config_summary() {
        let config = Config::from_pairs([
            ("deck_title", ConfigValue::from("Quarterly")),
            ("presenter_name", ConfigValue::from("Sam")),
        ]);

        let summary = ConfigSummary::from_config(&config);
        assert_eq!(summary.title_slide_font_size, Some(44.0));
        let text = summary.to_string();
        assert!(text.contains("Title: Quarterly"));
        assert!(text.contains("Presenter: Sam"));
        assert!(text.contains("Font sizes: Title=44, Section=40, Content=36"));
        assert!(text.contains(&format!("Total settings: {}", config.len())));
    }
}
