pub mod cards;
pub mod outlets;

pub use cards::{numbered, StoryCard};
pub use outlets::{
    featured_outlet, ownership_groups, scatter_points, ColoringMode, DistributionView, OwnerGroup,
    ScatterPoint,
};
