//! Slide prompts and batch instruction rendering.
//!
//! Each slide of the IR deck has a fixed extraction prompt. A batch
//! instruction is the shared output-format rules followed by one section per
//! slide in the unit's range.

use crate::error::DeckError;
use crate::generation::plan::Unit;
use crate::generation::split::IMMUTABLE_META_KEYS;

/// First and last slide index the catalog knows about.
pub const FIRST_SLIDE: u32 = 1;
pub const LAST_SLIDE: u32 = 18;

/// Renders the extraction prompt for one slide.
pub trait PromptRenderer: Send + Sync {
    fn render(&self, slide_index: u32) -> Result<String, DeckError>;
}

struct SlideSpec {
    title: &'static str,
    focus: &'static str,
    keys: &'static [&'static str],
    section_header: bool,
}

const SLIDES: [SlideSpec; 18] = [
    SlideSpec {
        title: "Cover",
        focus: "Company tagline, product name, and a one-line positioning statement.",
        keys: &["subtitle", "mainTitle", "bottomTitle"],
        section_header: false,
    },
    SlideSpec {
        title: "External and internal motivation",
        focus: "Why this problem matters now; three concrete issues with short explanations.",
        keys: &[
            "mainHeading",
            "description",
            "issue1Title",
            "issue1Description",
            "issue2Title",
            "issue2Description",
            "issue3Title",
            "issue3Description",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Need for the item",
        focus: "As-is versus to-be comparison across four divisions.",
        keys: &["mainTitle", "rows[{division, asIs, toBe} x4]"],
        section_header: false,
    },
    SlideSpec {
        title: "TAM / SAM / SOM",
        focus: "Market sizes with amounts, market names and one-line rationales.",
        keys: &[
            "leftTopTitle",
            "leftTopDescription",
            "tamLabel",
            "tamAmount",
            "tamMarketName",
            "tamDescription",
            "samLabel",
            "samAmount",
            "samMarketName",
            "samDescription",
            "somLabel",
            "somAmount",
            "somMarketName",
            "somDescription",
            "leftBottomTitle",
            "leftBottomDescription",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Market analysis (target persona)",
        focus: "One representative customer persona and their needs, problems and decision factors.",
        keys: &[
            "personName",
            "personInfoValues",
            "lifestyleContent",
            "needsContent",
            "problemsContent",
            "infoSourceContent",
            "decisionFactorsContent",
            "avoidanceFactorsContent",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Solution",
        focus: "How the product solves the stated problems, as a set of cards.",
        keys: &["mainTitle", "cards[{title, description}]"],
        section_header: true,
    },
    SlideSpec {
        title: "Core value",
        focus: "Four strengths and a central summary phrase.",
        keys: &[
            "strength1Title",
            "strength1Description",
            "strength2Title",
            "strength2Description",
            "strength3Title",
            "strength3Description",
            "strength4Title",
            "strength4Description",
            "centerText",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Development plan",
        focus: "Development milestones table plus IP and certification status.",
        keys: &[
            "leftSectionTitle",
            "table",
            "rightSectionTitle",
            "ipr",
            "certification",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Customer validation",
        focus: "Customer journey, validation activities and measured results.",
        keys: &[
            "journeyMapTitle",
            "validationStatusTitle",
            "journeyMap",
            "validationTable",
            "metrics",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Competitor analysis and competitiveness",
        focus: "Comparison of three competitors and the company across four divisions.",
        keys: &[
            "mainHeading",
            "headerDivision",
            "headerCompetitor1",
            "headerCompetitor2",
            "headerCompetitor3",
            "headerOurCompany",
            "row{1..4}Division",
            "row{1..4}Competitor{1..3}",
            "row{1..4}OurCompany",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Business model",
        focus: "Value flows between customers, the company and partners.",
        keys: &[
            "nodes",
            "customerToCompanyTop",
            "customerToCompanyBottom",
            "companyToRestaurantLeft",
            "companyToRestaurantRight",
            "companyToRiderTop",
            "companyToRiderBottom",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Revenue model",
        focus: "Revenue sources, unit prices and a four-year sales chart.",
        keys: &[
            "salesPlanTitle",
            "salesBasisTitle",
            "yAxisUnit",
            "deliveryFeeTitle",
            "deliveryFeeList",
            "adCostTitle",
            "adCostList",
            "chartCategories",
            "chartData",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Market entry strategy",
        focus: "Go-to-market strategy as a set of strategy cards.",
        keys: &["mainTitle", "subTitle", "strategyCards"],
        section_header: true,
    },
    SlideSpec {
        title: "Performance and projections",
        focus: "Seven-row, four-year table of key performance figures.",
        keys: &[
            "tableHeaderDivision",
            "tableHeaderYear{1..4}",
            "row{1..7}Division",
            "row{1..7}Year{1..4}",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Roadmap",
        focus: "Four phases, each with a yearly goal, objective and strategy.",
        keys: &[
            "mainTitle",
            "phase{1..4}Title",
            "phase{1..4}YearGoal",
            "phase{1..4}ObjectiveTitle",
            "phase{1..4}Strategy",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Funding and spending plan",
        focus: "Funding rounds by year and the allocation of funds.",
        keys: &[
            "fundingPlanTitle",
            "spendingPlanTitle",
            "fundingPlan{1..4}Year",
            "fundingPlan{1..4}Content",
            "chartCategories",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Team",
        focus: "Four key team members with position, name and background.",
        keys: &[
            "team{1..4}Position",
            "team{1..4}PhotoText",
            "team{1..4}Name",
            "team{1..4}Description",
        ],
        section_header: true,
    },
    SlideSpec {
        title: "Vision and closing",
        focus: "Upcoming milestones, the brand vision, and a formal closing remark.",
        keys: &["visionStatement", "coreMessage", "closingRemark"],
        section_header: false,
    },
];

/// Built-in prompts for the eighteen-slide IR deck.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlidePromptCatalog;

impl SlidePromptCatalog {
    pub fn new() -> Self {
        Self
    }

    /// Title of a slide, if the index is known.
    pub fn title(slide_index: u32) -> Option<&'static str> {
        Self::spec(slide_index).map(|spec| spec.title)
    }

    fn spec(slide_index: u32) -> Option<&'static SlideSpec> {
        if !(FIRST_SLIDE..=LAST_SLIDE).contains(&slide_index) {
            return None;
        }
        SLIDES.get((slide_index - FIRST_SLIDE) as usize)
    }
}

impl PromptRenderer for SlidePromptCatalog {
    fn render(&self, slide_index: u32) -> Result<String, DeckError> {
        let spec = Self::spec(slide_index).ok_or(DeckError::UnsupportedIndex(slide_index))?;

        let mut prompt = format!(
            "Slide {index}: {title}\n\
             Content: {focus}\n\
             Keys, in this order: {keys}\n\
             Write every value in Korean and take facts only from the HTML document.",
            index = slide_index,
            title = spec.title,
            focus = spec.focus,
            keys = spec.keys.join(", "),
        );
        // Section headers come from the deck layout.
        if spec.section_header {
            prompt.push_str(&format!(
                "\nDo not output the section header fields ({}).",
                IMMUTABLE_META_KEYS.join(", ")
            ));
        }
        Ok(prompt)
    }
}

/// Render the full instruction for one unit: format rules, then one section per slide.
pub fn render_instruction(renderer: &dyn PromptRenderer, unit: &Unit) -> Result<String, DeckError> {
    let expected = unit.expected_count();
    let mut instruction = format!(
        "Using the HTML document above, produce slides {start} to {end} as independent JSON objects.\n\
         Separate consecutive slides with a line containing only ---.\n\
         Follow each slide's structure strictly. Do not add explanations or code fences.\n\
         \n\
         [Most important]\n\
         - Never rename, add or drop JSON keys; use the keys exactly as given.\n\
         - Keep braces, brackets, commas, quotes and key order as specified.\n\
         - Output exactly {expected} JSON objects.\n",
        start = unit.range_start,
        end = unit.range_end,
        expected = expected,
    );

    let divider = "=".repeat(10);
    for slide_index in unit.slide_indices() {
        let prompt = renderer.render(slide_index)?;
        instruction.push_str(&format!(
            "{divider}\nThis is slide {slide_index}. Extraction prompt:\n>> {prompt}\n{divider}\n",
        ));
    }

    Ok(instruction)
}
