//! Widgets that ship with weft.

pub mod cloud_widget;
pub mod github_gist;

use crate::registry::RegistryBuilder;

pub(crate) fn register_all(builder: &mut RegistryBuilder) {
    builder
        .register(github_gist::WIDGET_TYPE, github_gist::create)
        .register(cloud_widget::WIDGET_TYPE, cloud_widget::create);
}
