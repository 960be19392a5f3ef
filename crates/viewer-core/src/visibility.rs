use serde::Serialize;

/// A page's box along the scroll axis, in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub id: u32,
    pub top: f32,
    pub height: f32,
}

impl PageBox {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollWindow {
    pub top: f32,
    pub height: f32,
}

impl ScrollWindow {
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VisiblePage {
    pub id: u32,
    pub percent: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VisibilityResult {
    pub visible: Vec<VisiblePage>,
    pub pre_render: Vec<u32>,
}

impl VisibilityResult {
    /// The most visible page, used for the current-page indicator.
    pub fn first(&self) -> Option<&VisiblePage> {
        self.visible.first()
    }

    pub fn visible_ids(&self) -> Vec<u32> {
        self.visible.iter().map(|page| page.id).collect()
    }

    /// Render candidates in priority order: visible pages, then pre-render.
    pub fn candidates(&self) -> Vec<u32> {
        self.visible.iter().map(|page| page.id).chain(self.pre_render.iter().copied()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.visible.is_empty() && self.pre_render.is_empty()
    }
}

/// Stacks pages vertically with `gap` above every page.
pub fn layout_continuous<I>(sizes: I, gap: f32) -> Vec<PageBox>
where
    I: IntoIterator<Item = (u32, f32)>,
{
    let gap = gap.max(0.0);
    let mut cursor = gap;

    sizes
        .into_iter()
        .map(|(id, height)| {
            let page = PageBox { id, top: cursor, height: height.max(0.0) };
            cursor = page.bottom() + gap;
            page
        })
        .collect()
}

/// Visible pages for a continuous layout plus at most one leading and one
/// trailing pre-render neighbour. `boxes` must be ordered by position.
pub fn visible_pages(
    window: ScrollWindow,
    boxes: &[PageBox],
    sort_by_visibility: bool,
) -> VisibilityResult {
    if boxes.is_empty() || window.height <= 0.0 {
        return VisibilityResult::default();
    }

    let top = window.top;
    let bottom = window.bottom();
    let visible_from_top = |page: &PageBox| page.bottom() > top;
    let visible_from_bottom = |page: &PageBox| page.top < bottom;

    let anchor = boxes.partition_point(|page| !visible_from_top(page));

    let mut visible = Vec::new();
    let mut pre_render = Vec::new();

    for page in &boxes[anchor..] {
        if visible_from_bottom(page) {
            visible.push(VisiblePage { id: page.id, percent: coverage_percent(page, top, bottom) });
            continue;
        }

        pre_render.push(page.id);
        break;
    }

    // Backtrack in case rounding put the anchor one page too far.
    for page in boxes[..anchor].iter().rev() {
        if visible_from_top(page) && visible_from_bottom(page) {
            visible.push(VisiblePage { id: page.id, percent: coverage_percent(page, top, bottom) });
            continue;
        }

        pre_render.push(page.id);
        break;
    }

    // Nothing intersects: the window sits in a gap or past the end. Keep the
    // page at the anchor (or the last page) so there is always a current page.
    if visible.is_empty() {
        let nearest = anchor.min(boxes.len() - 1);
        visible.push(VisiblePage { id: boxes[nearest].id, percent: 0 });
        pre_render = boxes[nearest + 1..]
            .first()
            .into_iter()
            .chain(boxes[..nearest].last())
            .map(|page| page.id)
            .collect();
    }

    if sort_by_visibility {
        visible.sort_by(|a, b| b.percent.cmp(&a.percent).then(a.id.cmp(&b.id)));
    }

    VisibilityResult { visible, pre_render }
}

/// Paged mode: only the current page is visible; its neighbours pre-render.
pub fn single_page_visibility(current: u32, page_count: u32) -> VisibilityResult {
    if current == 0 || current > page_count {
        return VisibilityResult::default();
    }

    let mut pre_render = Vec::with_capacity(2);
    if current > 1 {
        pre_render.push(current - 1);
    }
    if current < page_count {
        pre_render.push(current + 1);
    }

    VisibilityResult { visible: vec![VisiblePage { id: current, percent: 100 }], pre_render }
}

fn coverage_percent(page: &PageBox, top: f32, bottom: f32) -> u8 {
    let hidden_top = (top - page.top).max(0.0);
    let hidden_bottom = (page.bottom() - bottom).max(0.0);

    if hidden_top == 0.0 && hidden_bottom == 0.0 {
        return 100;
    }
    if page.height <= 0.0 {
        return 0;
    }

    let shown = (page.height - hidden_top - hidden_bottom).max(0.0);
    let percent = (shown * 100.0 / page.height).floor() as u32;

    percent.min(99) as u8
}
