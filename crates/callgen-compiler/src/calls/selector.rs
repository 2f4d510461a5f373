//! Method-call entry points and the tier selector.

use tracing::debug;

use callgen_core::{CompilationError, DataType, TypeHash, primitives};
use callgen_registry::names;

use super::{CallLowering, CallRequest, CallTier, Result, Value};
use crate::adapter::Adapter;
use crate::ast::{Expr, Message, MethodCallExpr, StaticCallExpr, contains_spread};

impl<'a, 'pool> CallLowering<'a, 'pool> {
    /// Lower `receiver.message(args)`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lower_method_call(&mut self, call: &MethodCallExpr<'_>) -> Result<CallTier> {
        self.mark_line(call.span);

        if self.is_closure_field_call(call) {
            self.lower_closure_field_call(call)?;
            debug!(method = ?call.message.name(), tier = ?CallTier::Closure, "lowered method call");
            return Ok(CallTier::Closure);
        }

        let (message, method_target) = match self.functional_target(call) {
            Some((name, sam)) => (Message::Name(name), Some(sam)),
            None => (call.message, call.method_target),
        };
        let request = CallRequest {
            receiver: call.receiver,
            message,
            args: call.args,
            adapter: self.select_adapter(call),
            sender: None,
            safe: call.safe,
            spread_safe: call.spread_safe,
            implicit_this: call.implicit_this,
            method_target,
            optimized_target: call.optimized_target,
            span: call.span,
        };

        let tier = self.make_call(request)?;
        debug!(method = ?request.message.name(), ?tier, "lowered method call");
        Ok(tier)
    }

    /// Lower `Owner.method(args)`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn lower_static_method_call(&mut self, call: &StaticCallExpr<'_>) -> Result<CallTier> {
        self.mark_line(call.span);
        let request = CallRequest {
            optimized_target: call.optimized_target,
            span: call.span,
            ..CallRequest::new(
                Expr::ClassRef(call.owner),
                Message::Name(call.method),
                call.args,
                Adapter::InvokeStaticMethod,
            )
        };
        let tier = self.make_call(request)?;
        debug!(method = call.method, ?tier, "lowered static method call");
        Ok(tier)
    }

    /// Lower one call through the first tier that accepts it.
    pub fn make_call(&mut self, mut request: CallRequest<'_>) -> Result<CallTier> {
        let explicit_receiver = request.receiver.is_super()
            || (request.receiver.is_this() && !request.implicit_this);
        let sender = if explicit_receiver {
            request.implicit_this = false;
            request.safe = false;
            self.frame.this_type
        } else {
            request.sender.unwrap_or(self.frame.class)
        };

        let spread = contains_spread(request.args);
        if let Some(value) = self.make_direct_call(&request, spread)? {
            self.materialize(value);
            return Ok(CallTier::Direct);
        }
        if self.make_cached_call(&request, spread)? {
            return Ok(CallTier::Cached);
        }
        self.make_uncached_call(&request, sender, spread)?;
        Ok(CallTier::Uncached)
    }

    fn select_adapter(&self, call: &MethodCallExpr<'_>) -> Adapter {
        if self.is_static_invocation(call) {
            Adapter::InvokeStaticMethod
        } else if call.receiver.is_super() {
            Adapter::InvokeMethodOnSuper
        } else if call.receiver.is_this() {
            Adapter::InvokeMethodOnCurrent
        } else {
            Adapter::InvokeMethod
        }
    }

    fn is_static_invocation(&self, call: &MethodCallExpr<'_>) -> bool {
        call.receiver.is_this()
            && (self.frame.is_static_method
                || (self.frame.is_static_context && !call.implicit_this))
    }

    /// `x.call(args)` on a functional interface calls its abstract method.
    fn functional_target(&self, call: &MethodCallExpr<'_>) -> Option<(&'a str, TypeHash)> {
        if call.message.name() != Some("call") || call.receiver.is_this() {
            return None;
        }
        let receiver_type = self.resolve_type(&call.receiver);
        if receiver_type.is_array() {
            return None;
        }
        let registry = self.registry;
        registry
            .single_abstract_method(receiver_type.type_hash)
            .map(|sam| (sam.name.as_str(), sam.method_hash))
    }

    // ==========================================================================
    // Direct Tier
    // ==========================================================================

    fn make_direct_call(
        &mut self,
        request: &CallRequest<'_>,
        spread: bool,
    ) -> Result<Option<Value>> {
        let registry = self.registry;

        if let Some(value) = self.make_class_for_name_call(request)? {
            return Ok(Some(value));
        }

        let options = self.frame.options;
        let fast_path_adapter = matches!(
            request.adapter,
            Adapter::InvokeMethodOnCurrent | Adapter::InvokeStaticMethod
        );
        if options.fast_path && options.optimize_for_int && fast_path_adapter {
            if let (Some(_), Some(hash)) = (request.message.name(), request.optimized_target) {
                let target = registry.method(hash).ok_or_else(|| {
                    CompilationError::UnknownMethod {
                        name: hash.to_string(),
                        span: request.span,
                    }
                })?;
                debug!(method = %target.name, "optimizer target on fast path");
                return self
                    .write_direct_call(target, true, None, request.args, request.span)
                    .map(Some);
            }
        }

        if spread {
            return Ok(None);
        }

        match request.method_target {
            Some(hash) => {
                let target = registry.method(hash).ok_or_else(|| {
                    CompilationError::UnknownMethod {
                        name: hash.to_string(),
                        span: request.span,
                    }
                })?;
                self.write_direct_call(
                    target,
                    request.implicit_this,
                    Some(request.receiver),
                    request.args,
                    request.span,
                )
                .map(Some)
            }
            None => Ok(None),
        }
    }

    /// `Class.forName(name)` binds straight to the built-in method.
    fn make_class_for_name_call(&mut self, request: &CallRequest<'_>) -> Result<Option<Value>> {
        let is_class_receiver =
            matches!(request.receiver, Expr::ClassRef(c) if c == primitives::CLASS);
        if !is_class_receiver
            || request.message.name() != Some(names::FOR_NAME)
            || request.args.len() != 1
            || request.args[0].is_spread()
        {
            return Ok(None);
        }
        let registry = self.registry;
        match registry.class_for_name() {
            Some(target) => self
                .write_direct_call(
                    target,
                    false,
                    Some(request.receiver),
                    request.args,
                    request.span,
                )
                .map(Some),
            None => Ok(None),
        }
    }

    // ==========================================================================
    // Closure Fields
    // ==========================================================================

    /// An implicit-this call naming a field of the class, with no method of
    /// that name and arity to compete with it.
    fn is_closure_field_call(&self, call: &MethodCallExpr<'_>) -> bool {
        let Some(name) = call.message.name() else {
            return false;
        };
        if !call.implicit_this || !call.receiver.is_this() {
            return false;
        }
        let class = self.frame.class;
        let Some(field) = self.registry.get(class).and_then(|e| e.find_field(name)) else {
            return false;
        };
        if self.is_static_invocation(call) && !field.is_static() {
            return false;
        }
        !self.registry.has_possible_method(class, name, call.args.len())
    }

    fn lower_closure_field_call(&mut self, call: &MethodCallExpr<'_>) -> Result<()> {
        let registry = self.registry;
        let class = self.frame.class;
        let name = call
            .message
            .name()
            .ok_or_else(|| CompilationError::internal("closure call without a name"))?;
        let field = registry
            .get(class)
            .and_then(|e| e.find_field(name))
            .ok_or_else(|| CompilationError::internal("closure field disappeared"))?;

        let start = self.stack.depth();
        if field.is_static() {
            self.emitter.emit_get_static_field(class, name);
        } else {
            self.emitter.emit_get_this();
            self.emitter.emit_get_field(name);
        }
        self.stack.push(field.data_type);
        self.box_top()?;

        self.load_argument_vector(call.args, call.span)?;
        self.emitter
            .emit_call_adapter(Adapter::InvokeClosure.id(), 2, 0);
        let pushed = self.pushed_since(start)?;
        self.stack.replace(DataType::object(), pushed)
    }
}
