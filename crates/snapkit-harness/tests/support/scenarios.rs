//! delete-block-in-inlines: a block-level `div` sits in a run of inline
//! content; clicking the root container removes it.

use std::cell::RefCell;
use std::rc::Rc;

use snapkit_dom::{NodeId, Style};
use snapkit_harness::{Done, HarnessError, Suite, TestContext};

pub const SUITE: &str = "delete-block-in-inlines";

/// The inline run's text once the block is gone.
pub const RUN_TEXT: &str = "Severalinline elements are in this sentence.";

/// The reference container's single text node.
pub const SENTENCE: &str = "Several inline elements are in this sentence.";

/// Where the block sits among the five inline siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    Beginning,
    /// After the third sibling.
    Middle,
    End,
}

impl Position {
    pub fn case_name(self) -> &'static str {
        match self {
            Position::Beginning => "beginning-001",
            Position::Middle => "middle-001",
            Position::End => "end-001",
        }
    }

    fn insert_before(self) -> usize {
        match self {
            Position::Beginning => 0,
            Position::Middle => 3,
            Position::End => 5,
        }
    }
}

/// What the click listener saw after its mutation had been captured.
#[derive(Debug, Clone)]
pub struct Observation {
    pub case: String,
    pub children: Vec<NodeId>,
    pub inline_run: Vec<NodeId>,
    pub text: String,
    pub block_connected: bool,
    pub block_markup: String,
    pub markup: String,
    pub click_listeners: usize,
}

pub type Observed = Rc<RefCell<Vec<Observation>>>;

pub fn container_style() -> Style {
    Style::from([
        ("background-color", "fuchsia"),
        ("color", "black"),
        ("font", "20px"),
        ("margin", "10px"),
    ])
}

pub fn block_style() -> Style {
    Style::from([
        ("border-left", "5px solid yellow"),
        ("border-right", "5px solid yellow"),
        ("margin", "10px 0"),
    ])
}

/// `<span>Several</span><span>inline elements</span> are <span>in this</span> sentence.`
pub fn inline_run(ctx: &TestContext) -> Result<Vec<NodeId>, HarnessError> {
    let span = |text: &str| {
        let text = ctx.create_text(text);
        ctx.create("span", Style::new(), [text])
    };
    Ok(vec![
        span("Several")?,
        span("inline elements")?,
        ctx.create_text(" are "),
        span("in this")?,
        ctx.create_text(" sentence."),
    ])
}

/// Which node the click listener removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Victim {
    Block,
    /// A regressed engine build: the first inline sibling goes instead.
    FirstInline,
}

/// The case body shared by all three positions.
pub async fn delete_block(
    ctx: TestContext,
    done: Done,
    position: Position,
    observed: Observed,
) -> Result<(), HarnessError> {
    remove_on_click(ctx, done, position, observed, Victim::Block).await
}

async fn remove_on_click(
    ctx: TestContext,
    done: Done,
    position: Position,
    observed: Observed,
    victim: Victim,
) -> Result<(), HarnessError> {
    let body = ctx.body();
    let container = ctx.create("div", container_style(), [])?;
    let container2 = ctx.create("div", container_style(), [])?;
    let label = ctx.create_text("block to remove");
    let node_to_delete = ctx.create("div", block_style(), [label])?;
    let run = inline_run(&ctx)?;
    let removed = match victim {
        Victim::Block => node_to_delete,
        Victim::FirstInline => run[0],
    };

    let listener_ctx = ctx.clone();
    let expected = run.clone();
    ctx.add_event_listener(body, "click", move |event| {
        let ctx = listener_ctx.clone();
        let done = done.clone();
        let observed = observed.clone();
        let expected = expected.clone();
        async move {
            ctx.dom().remove_child(container, removed)?;
            ctx.match_screenshot().await?;
            ctx.remove_event_listener(ctx.body(), "click", &event.listener);

            let dom = ctx.dom();
            observed.borrow_mut().push(Observation {
                case: ctx.case_name().to_string(),
                children: dom.children(container)?,
                inline_run: expected,
                text: dom.text_content(container)?,
                block_connected: dom.is_connected(node_to_delete)?,
                block_markup: dom.read(|doc| doc.markup_of(node_to_delete))?,
                markup: dom.to_markup(),
                click_listeners: dom.listener_count(ctx.body(), "click"),
            });
            done.complete();
            Ok::<_, HarnessError>(())
        }
    })?;

    let dom = ctx.dom();
    for (i, &node) in run.iter().enumerate() {
        if i == position.insert_before() {
            dom.append(container, node_to_delete)?;
        }
        dom.append(container, node)?;
    }
    if position == Position::End {
        dom.append(container, node_to_delete)?;
    }

    let sentence = ctx.create_text(SENTENCE);
    dom.append(container2, sentence)?;

    dom.append(body, container)?;
    dom.append(body, container2)?;
    ctx.match_screenshot().await?;

    ctx.click(body)?;
    Ok(())
}

/// The suite in declaration order: beginning, end, middle.
pub fn delete_block_suite(observed: &Observed) -> Suite {
    [Position::Beginning, Position::End, Position::Middle]
        .into_iter()
        .fold(Suite::describe(SUITE), |suite, position| {
            let observed = observed.clone();
            suite.it_with_done(position.case_name(), move |ctx, done| {
                delete_block(ctx, done, position, observed.clone())
            })
        })
}

/// `beginning-001` with the wrong node removed on click.
pub fn regressed_suite(observed: &Observed) -> Suite {
    let observed = observed.clone();
    Suite::describe(SUITE).it_with_done(Position::Beginning.case_name(), move |ctx, done| {
        remove_on_click(ctx, done, Position::Beginning, observed.clone(), Victim::FirstInline)
    })
}
