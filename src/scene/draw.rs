//! Hierarchical drawing of entity trees onto a [`Surface`]
//!
//! Each entity is drawn inside a `save`/`restore` pair so its translate, scale,
//! rotation, fill color and opacity apply to its elements and its children only.

use glam::Vec2;

use super::element::{Element, TextContent};
use super::entity::Entity;
use crate::surface::Surface;
use crate::transform::Rect;

pub fn draw_entity(surface: &mut dyn Surface, entity: &Entity) {
    if entity.opacity <= 0.0 || (entity.elements.is_empty() && entity.children().is_empty()) {
        return;
    }

    surface.save();
    surface.translate(entity.position.x, entity.position.y);

    if entity.size != Vec2::ONE {
        surface.scale(entity.size.x, entity.size.y);
    }

    if entity.angle != 0.0 {
        surface.rotate(entity.angle);
    }

    if let Some(color) = &entity.color {
        surface.set_fill(color);
    }

    if entity.opacity < 1.0 {
        let alpha = surface.alpha();
        surface.set_alpha(alpha * entity.opacity);
    }

    for element in &entity.elements {
        draw_element(surface, element);
    }

    entity
        .children()
        .for_each(|child| draw_entity(surface, &child.borrow()));

    surface.restore();
}

fn draw_element(surface: &mut dyn Surface, element: &Element) {
    let opacity = element.opacity();
    if opacity <= 0.0 {
        return;
    }

    // Images that haven't finished loading are skipped this frame
    match element {
        Element::Image(i) if !i.image.loaded() => return,
        Element::ImageRegion(i) if !i.image.loaded() => return,
        _ => {}
    }

    surface.save();

    // Flip back to y-down so text and images render upright
    surface.scale(1.0, -1.0);

    if opacity < 1.0 {
        let alpha = surface.alpha();
        surface.set_alpha(alpha * opacity);
    }

    match element {
        Element::Rectangle(r) => {
            if let Some(color) = &r.color {
                surface.set_fill(color);
            }
            surface.fill_rect(r.x, -r.y, r.width, r.height);
        }
        Element::Image(i) => {
            let dest = Rect::new(Vec2::new(i.x, -i.y), Vec2::new(i.x + i.width, -i.y + i.height));
            surface.draw_image(&i.image, None, dest);
        }
        Element::ImageRegion(i) => {
            let dest = Rect::new(Vec2::new(i.x, -i.y), Vec2::new(i.x + i.width, -i.y + i.height));
            surface.draw_image(&i.image, Some(i.source), dest);
        }
        Element::Text(t) => {
            if let Some(color) = &t.color {
                surface.set_fill(color);
            }
            if let Some(font) = &t.font {
                surface.set_font(font);
            }
            surface.set_text_baseline(t.baseline);
            surface.set_text_align(t.align);

            match &t.content {
                TextContent::Line(text) => {
                    if !text.is_empty() {
                        surface.fill_text(text, t.x, -t.y);
                    }
                }
                TextContent::Lines(lines) => {
                    let mut offset = 0.0;
                    for line in lines {
                        surface.fill_text(line, t.x, -t.y + offset);
                        offset += t.line_height;
                    }
                }
            }
        }
    }

    surface.restore();
}
