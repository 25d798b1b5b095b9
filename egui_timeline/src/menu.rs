//! 右键菜单树
//!
//! 路径以点分隔（如 `"Track.Remove"`），插入时按需创建中间节点。
//! 条件回调决定某个上下文下节点是否可见；动作回调返回交给组件执行的命令。

use crate::editor::TimelineCommand;
use crate::error::{Result, TimelineError};
use crate::structure::{SegmentId, TrackId};
use std::fmt;

/// 菜单打开时指针下的对象
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MenuContext {
    pub track: Option<TrackId>,
    pub segment: Option<SegmentId>,
    pub time: f64,
    pub repeat_set: bool,
    pub repeat_enabled: bool,
}

pub type MenuAction = Box<dyn Fn(&MenuContext) -> Option<TimelineCommand>>;
pub type MenuCondition = Box<dyn Fn(&MenuContext) -> bool>;

pub struct MenuNode {
    pub label: String,
    pub action: Option<MenuAction>,
    pub condition: Option<MenuCondition>,
    pub children: Vec<MenuNode>,
}

impl fmt::Debug for MenuNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MenuNode")
            .field("label", &self.label)
            .field("action", &self.action.is_some())
            .field("condition", &self.condition.is_some())
            .field("children", &self.children)
            .finish()
    }
}

impl MenuNode {
    fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            action: None,
            condition: None,
            children: Vec::new(),
        }
    }

    pub fn is_visible(&self, ctx: &MenuContext) -> bool {
        self.condition.as_ref().map_or(true, |cond| cond(ctx))
    }

    pub fn activate(&self, ctx: &MenuContext) -> Option<TimelineCommand> {
        self.action.as_ref().and_then(|action| action(ctx))
    }
}

#[derive(Debug)]
pub struct MenuTree {
    root: MenuNode,
}

impl Default for MenuTree {
    fn default() -> Self {
        Self {
            root: MenuNode::new(""),
        }
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').map(str::trim).filter(|s| !s.is_empty()).collect()
}

impl MenuTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// 插入或更新叶子节点。`position` 指定在兄弟节点中的位置，缺省追加到末尾
    pub fn add_item(
        &mut self,
        path: &str,
        action: Option<MenuAction>,
        condition: Option<MenuCondition>,
        position: Option<usize>,
    ) -> Result<()> {
        let action = action.ok_or_else(|| TimelineError::MissingMenuAction(path.to_string()))?;
        let labels = split_path(path);
        let Some((leaf, parents)) = labels.split_last() else {
            return Err(TimelineError::InvalidMenuPosition {
                path: path.to_string(),
                position: position.unwrap_or(0),
            });
        };

        // 先校验位置，失败时树保持不变
        if let (Some(position), Some(parent)) = (position, self.find(parents)) {
            let exists = parent.children.iter().any(|c| c.label == *leaf);
            if !exists && position > parent.children.len() {
                return Err(TimelineError::InvalidMenuPosition {
                    path: path.to_string(),
                    position,
                });
            }
        } else if let Some(position) = position {
            if position > 0 {
                return Err(TimelineError::InvalidMenuPosition {
                    path: path.to_string(),
                    position,
                });
            }
        }

        let mut node = &mut self.root;
        for label in parents {
            let index = match node.children.iter().position(|c| c.label == *label) {
                Some(index) => index,
                None => {
                    node.children.push(MenuNode::new(label));
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }

        match node.children.iter_mut().find(|c| c.label == *leaf) {
            Some(existing) => {
                existing.action = Some(action);
                existing.condition = condition;
            }
            None => {
                let mut item = MenuNode::new(leaf);
                item.action = Some(action);
                item.condition = condition;
                let index = position.unwrap_or(node.children.len());
                node.children.insert(index, item);
            }
        }
        Ok(())
    }

    fn find(&self, labels: &[&str]) -> Option<&MenuNode> {
        let mut node = &self.root;
        for label in labels {
            node = node.children.iter().find(|c| c.label == *label)?;
        }
        Some(node)
    }

    /// 路径下的子节点；空路径返回顶层
    pub fn items(&self, path: &str) -> Option<&[MenuNode]> {
        self.find(&split_path(path)).map(|n| n.children.as_slice())
    }

    pub fn node(&self, path: &str) -> Option<&MenuNode> {
        self.find(&split_path(path))
    }

    pub fn visible_items<'a>(&'a self, path: &str, ctx: &MenuContext) -> Vec<&'a MenuNode> {
        self.items(path)
            .map(|items| items.iter().filter(|n| n.is_visible(ctx)).collect())
            .unwrap_or_default()
    }

    /// 组件自带的菜单项
    pub fn with_defaults() -> Self {
        fn add(
            tree: &mut MenuTree,
            path: &str,
            action: impl Fn(&MenuContext) -> Option<TimelineCommand> + 'static,
            condition: impl Fn(&MenuContext) -> bool + 'static,
        ) {
            // 默认项路径固定，插入不会失败
            let _ = tree.add_item(path, Some(Box::new(action)), Some(Box::new(condition)), None);
        }

        let mut tree = Self::new();
        add(
            &mut tree,
            "Track.Remove",
            |ctx| ctx.track.clone().map(TimelineCommand::RemoveTrack),
            |ctx| ctx.track.is_some(),
        );
        add(
            &mut tree,
            "Segment.Delete",
            |ctx| {
                Some(TimelineCommand::DeleteSegment {
                    track: ctx.track.clone()?,
                    segment: ctx.segment?,
                })
            },
            |ctx| ctx.segment.is_some(),
        );
        add(
            &mut tree,
            "Segment.Split",
            |ctx| {
                Some(TimelineCommand::SplitSegment {
                    track: ctx.track.clone()?,
                    segment: ctx.segment?,
                    time: ctx.time,
                })
            },
            |ctx| ctx.segment.is_some(),
        );
        add(
            &mut tree,
            "Repeat.Toggle",
            |ctx| Some(TimelineCommand::SetAbRepeatOn(!ctx.repeat_enabled)),
            |ctx| ctx.repeat_set,
        );
        add(
            &mut tree,
            "Repeat.Clear",
            |_| Some(TimelineCommand::ClearRepeat),
            |ctx| ctx.repeat_set,
        );
        tree
    }
}
