use serde::Serialize;

use super::repo_types::Category;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDescriptor {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
}

impl Category {
    pub fn display_name(&self) -> &'static str {
        match self {
            Category::HomeCleaning => "Home Cleaning",
            Category::Plumbing => "Plumbing",
            Category::Electrical => "Electrical",
            Category::Carpentry => "Carpentry",
            Category::Painting => "Painting",
            Category::ApplianceRepair => "Appliance Repair",
            Category::PestControl => "Pest Control",
            Category::BeautyWellness => "Beauty & Wellness",
            Category::Fitness => "Fitness",
            Category::Tutoring => "Tutoring",
            Category::Photography => "Photography",
            Category::EventPlanning => "Event Planning",
            Category::MovingPacking => "Moving & Packing",
            Category::Gardening => "Gardening",
            Category::Automotive => "Automotive",
            Category::Other => "Other",
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            Category::HomeCleaning => "🧹",
            Category::Plumbing => "🔧",
            Category::Electrical => "⚡",
            Category::Carpentry => "🔨",
            Category::Painting => "🎨",
            Category::ApplianceRepair => "🔌",
            Category::PestControl => "🐜",
            Category::BeautyWellness => "💆",
            Category::Fitness => "💪",
            Category::Tutoring => "📚",
            Category::Photography => "📷",
            Category::EventPlanning => "🎉",
            Category::MovingPacking => "📦",
            Category::Gardening => "🌱",
            Category::Automotive => "🚗",
            Category::Other => "🛠️",
        }
    }
}

/// Static category list; no storage access.
pub fn list_categories() -> Vec<CategoryDescriptor> {
    Category::ALL
        .iter()
        .map(|c| CategoryDescriptor {
            id: c.as_str(),
            name: c.display_name(),
            icon: c.icon(),
        })
        .collect()
}
