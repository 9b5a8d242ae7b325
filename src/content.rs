//! Marketing copy for the site pages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Home,
    About,
    Features,
    Contact,
}

impl Page {
    pub const ALL: [Page; 4] = [Page::Home, Page::About, Page::Features, Page::Contact];

    pub fn path(self) -> &'static str {
        match self {
            Page::Home => "/",
            Page::About => "/about",
            Page::Features => "/features",
            Page::Contact => "/contact",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Page::Home => "Home",
            Page::About => "About",
            Page::Features => "Features",
            Page::Contact => "Contact",
        }
    }

    /// Tag the chat widget reports for this page.
    pub fn slug(self) -> &'static str {
        match self {
            Page::Home => "home",
            Page::About => "about",
            Page::Features => "features",
            Page::Contact => "contact",
        }
    }

    pub fn sitemap_priority(self) -> &'static str {
        match self {
            Page::Home => "1.0",
            _ => "0.7",
        }
    }
}

pub const PRODUCT_NAME: &str = "SiteSafe";
pub const TAGLINE: &str = "PPE compliance monitoring for construction sites";

pub struct Feature {
    pub title: &'static str,
    pub summary: &'static str,
}

pub const FEATURES: &[Feature] = &[
    Feature {
        title: "Real-time PPE checks",
        summary: "Cameras at site entry points confirm hard hats, vests, and eye protection before a worker steps on site.",
    },
    Feature {
        title: "Instant alerts",
        summary: "Supervisors get a notification the moment a required item is missing, with the zone and time attached.",
    },
    Feature {
        title: "Compliance reports",
        summary: "Daily and weekly summaries map every alert to the relevant OSHA standard for audits and toolbox talks.",
    },
    Feature {
        title: "Zone rules",
        summary: "Set stricter requirements for fall-hazard areas, electrical rooms, or high-noise work.",
    },
    Feature {
        title: "Privacy first",
        summary: "Only compliance events are stored. Faces are blurred and footage never leaves the site gateway.",
    },
    Feature {
        title: "Safety assistant",
        summary: "Crews can ask quick PPE and site-safety questions any time through the built-in assistant.",
    },
];

pub const TECHNOLOGIES: &[&str] = &[
    "Computer vision",
    "Edge processing",
    "Cloud dashboards",
    "Mobile alerts",
    "OSHA-mapped reporting",
];

pub struct Stat {
    pub value: &'static str,
    pub label: &'static str,
}

pub const STATS: &[Stat] = &[
    Stat {
        value: "6 ft",
        label: "fall protection threshold",
    },
    Stat {
        value: "16",
        label: "safety topics covered by the assistant",
    },
    Stat {
        value: "24/7",
        label: "site monitoring",
    },
];

pub const SUGGESTED_QUESTIONS: &[&str] = &[
    "What PPE do I need?",
    "What should I do in an emergency?",
    "When is fall protection required?",
    "How often should scaffolds be inspected?",
];

pub struct ContactInfo {
    pub email: &'static str,
    pub phone: &'static str,
    pub address: &'static str,
    pub hours: &'static str,
}

pub const CONTACT: ContactInfo = ContactInfo {
    email: "hello@sitesafe.example",
    phone: "+1 (555) 010-0199",
    address: "200 Builder Way, Suite 4, Denver, CO",
    hours: "Monday to Friday, 8am to 6pm MT",
};

pub const ABOUT_STORY: &str = r#"
## Why we started

Falls, struck-by incidents, and electrocutions account for most construction
fatalities every year, and missing PPE shows up in a large share of the
investigations. We spent years on job sites watching good crews skip a
harness or a hard hat because a check was easy to forget.

## What we are building

SiteSafe is a concept for **automatic PPE verification**. Cameras at the
gate and in high-risk zones check for the equipment each area requires, and
supervisors hear about gaps while they can still fix them.

## How we work

- Safety rules come from OSHA 29 CFR 1926 and the ANSI standards behind it.
- Alerts go to people who can act on them, not to a dashboard nobody reads.
- Worker privacy is part of the design, not an afterthought.
"#;
